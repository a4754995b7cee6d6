use crate::config::DqnConfig;
use crate::error::DqnError;
use crate::network::NetworkConfig;
use crate::optimizer::OptimizerKind;

#[test]
fn test_defaults() {
    let config = DqnConfig::default();
    assert_eq!(config.downsample, 2);
    assert_eq!(config.frame_skip, 4);
    assert_eq!(config.replay_capacity, 20_000);
    assert_eq!(config.batch_size, 32);
    assert_eq!(config.initial_learning_rate, 1e-4);
    assert_eq!(config.optimizer, OptimizerKind::RmsProp);
    assert_eq!(config.rms_decay, 0.99);
    assert_eq!(config.print_cost, 10_000);
    assert_eq!(config.start_learning, 100);
    assert_eq!(config.save_model, 100_000);
    assert_eq!(config.discount, 0.99);
    assert_eq!(config.target_sync_interval, 1);
    assert!(config.validate().is_ok());
}

#[test]
fn test_schedules() {
    let config = DqnConfig::default();
    let epsilon = config.epsilon_schedule();
    assert_eq!(epsilon.value(0), 1.0);
    assert_eq!(epsilon.value(500_000), 0.1);

    let lr = config.learning_rate(1e-3, 0.0, 10).learning_rate_schedule();
    assert_eq!(lr.value(0), 1e-3);
    assert_eq!(lr.value(10), 0.0);
}

#[test]
fn test_validate_rejects() {
    let invalid = vec![
        DqnConfig::default().replay_capacity(0),
        DqnConfig::default().batch_size(0),
        DqnConfig::default().start_learning(0),
        DqnConfig::default().discount(1.0),
        DqnConfig::default().discount(-0.1),
        DqnConfig::default().learning_rate(0.0, 0.0, 10),
        DqnConfig::default().learning_rate(f32::NAN, 0.0, 10),
        DqnConfig::default().learning_rate(1e-3, -1.0, 10),
        DqnConfig::default().rms_decay(1.0),
        DqnConfig::default().target_sync_interval(0),
        DqnConfig::default().network(NetworkConfig {
            hidden_sizes: vec![],
            ..NetworkConfig::default()
        }),
        DqnConfig::default().network(NetworkConfig {
            hidden_sizes: vec![16, 0],
            ..NetworkConfig::default()
        }),
    ];
    for config in invalid {
        assert!(
            matches!(config.validate(), Err(DqnError::InvalidParameter { .. })),
            "{:?}",
            config
        );
    }
}

#[test]
fn test_yaml_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dqn.yaml");
    let config = DqnConfig::default()
        .batch_size(8)
        .optimizer(OptimizerKind::Adam)
        .seed(3);

    config.save(&path).unwrap();
    assert_eq!(DqnConfig::load(&path).unwrap(), config);
}

#[test]
fn test_yaml_partial_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dqn.yaml");
    std::fs::write(&path, "batch_size: 4\ndiscount: 0.5\n").unwrap();

    let config = DqnConfig::load(&path).unwrap();
    assert_eq!(config.batch_size, 4);
    assert_eq!(config.discount, 0.5);
    assert_eq!(config.replay_capacity, 20_000);
    assert_eq!(config.network, NetworkConfig::default());
}

#[test]
fn test_yaml_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dqn.yaml");
    std::fs::write(&path, "batch_size: [1, 2]\n").unwrap();
    assert!(matches!(DqnConfig::load(&path), Err(DqnError::Serialization(_))));
    assert!(matches!(
        DqnConfig::load(&dir.path().join("missing.yaml")),
        Err(DqnError::Io(_))
    ));
}
