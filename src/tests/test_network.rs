use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::error::DqnError;
use crate::layers::WeightInit;
use crate::network::{argmax, Architecture, NetOption, NetworkConfig, Output, Parameters, QNetwork};
use crate::optimizer::OptimizerKind;

fn network(kind: OptimizerKind, seed: u64) -> QNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    Architecture::new(&[3], 2)
        .hidden_sizes(&[8])
        .build(kind, 0.9, 0.01, &mut rng)
        .unwrap()
}

fn states() -> Array2<f32> {
    array![
        [0.1, -0.4, 0.9],
        [1.0, 0.2, -0.3],
        [-0.5, 0.5, 0.5],
        [0.0, 0.3, -0.8]
    ]
}

fn zeroed(parameters: &Parameters) -> Parameters {
    parameters
        .iter()
        .map(|(name, tensor)| (name.clone(), tensor.mapv(|_| 0.0)))
        .collect()
}

#[test]
fn test_architecture_layout() {
    let architecture = Architecture::new(&[2, 3], 4).hidden_sizes(&[5, 7]);
    assert_eq!(architecture.state_size(), 6);
    assert_eq!(architecture.layer_sizes(), vec![6, 5, 7, 4]);
    assert!(architecture.validate().is_ok());

    assert!(Architecture::new(&[], 2).validate().is_err());
    assert!(Architecture::new(&[3], 0).validate().is_err());
    assert!(Architecture::new(&[3], 2).hidden_sizes(&[4, 0]).validate().is_err());
}

#[test]
fn test_build_network() {
    let network = network(OptimizerKind::RmsProp, 0);
    assert_eq!(network.layers().len(), 2);
    assert_eq!(network.num_actions(), 2);
    assert_eq!(network.state_size(), 3);
    assert_eq!(network.parameter_count(), 3 * 8 + 8 + 8 * 2 + 2);
    assert_eq!(network.optimizer_kind(), OptimizerKind::RmsProp);
    assert_eq!(network.option(NetOption::LearningRate), 0.01);
    assert!(format!("{}", network).starts_with("QNetwork"));
}

#[test]
fn test_inference_outputs() {
    let network = network(OptimizerKind::Sgd, 1);
    let states = states();

    let values = network.values(states.view()).unwrap();
    assert_eq!(values.dim(), (4, 2));

    let value = network.value(states.view()).unwrap();
    let choice = network.choice(states.view()).unwrap();
    for i in 0..4 {
        let row = values.row(i);
        assert_eq!(value[i], row[0].max(row[1]));
        assert_eq!(choice.row(i).sum(), 1.0);
        assert_eq!(choice[[i, argmax(row)]], 1.0);
    }

    assert_eq!(
        network.compute(Output::Value, states.view()).unwrap().shape(),
        &[4]
    );
    assert_eq!(
        network.compute(Output::Choice, states.view()).unwrap().shape(),
        &[4, 2]
    );
}

#[test]
fn test_choice_ties_go_to_lowest_index() {
    let mut network = network(OptimizerKind::Sgd, 2);
    let parameters = zeroed(&network.parameters());
    network.set_parameters(&parameters).unwrap();

    let choice = network.choice(states().view()).unwrap();
    for row in choice.rows() {
        assert_eq!(row.to_vec(), vec![1.0, 0.0]);
    }
    assert_eq!(argmax(array![2.0, 5.0, 5.0].view()), 1);
}

#[test]
fn test_wrong_state_size() {
    let network = network(OptimizerKind::Sgd, 0);
    let states = Array2::zeros((2, 4));
    assert!(matches!(
        network.values(states.view()),
        Err(DqnError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_train_returns_pre_update_cost() {
    let mut network = network(OptimizerKind::Sgd, 3);
    let states = states();
    let actions = [0, 1, 1, 0];
    let targets = array![1.0, -1.0, 0.5, 0.0];

    let values = network.values(states.view()).unwrap();
    let expected: f32 = actions
        .iter()
        .enumerate()
        .map(|(i, &a)| (values[[i, a]] - targets[i]).powi(2))
        .sum::<f32>()
        / 4.0;

    let cost = network.train(states.view(), &actions, targets.view()).unwrap();
    assert!((cost - expected).abs() < 1e-5);
    assert_ne!(network.values(states.view()).unwrap(), values);
}

#[test]
fn test_train_reduces_cost() {
    let mut network = network(OptimizerKind::Sgd, 4);
    let states = states();
    let actions = [0, 1, 1, 0];
    let targets = array![1.0, -1.0, 0.5, 0.0];

    let first = network.train(states.view(), &actions, targets.view()).unwrap();
    let mut last = first;
    for _ in 0..300 {
        last = network.train(states.view(), &actions, targets.view()).unwrap();
    }
    assert!(last < first, "{} >= {}", last, first);
}

#[test]
fn test_train_with_every_optimizer() {
    for kind in [OptimizerKind::Sgd, OptimizerKind::Adam, OptimizerKind::RmsProp] {
        let mut network = network(kind, 5);
        let before = network.parameters();
        let cost = network
            .train(states().view(), &[1, 1, 0, 0], array![0.5, 0.5, 0.5, 0.5].view())
            .unwrap();
        assert!(cost.is_finite());
        assert_ne!(network.parameters(), before);
    }
}

#[test]
fn test_train_only_moves_taken_action() {
    let mut network = network(OptimizerKind::Sgd, 6);
    let before = network.layers()[1].clone();

    network
        .train(states().view(), &[0, 0, 0, 0], array![3.0, 3.0, 3.0, 3.0].view())
        .unwrap();

    let after = &network.layers()[1];
    assert_eq!(after.biases[1], before.biases[1]);
    assert_eq!(after.weights.column(1), before.weights.column(1));
    assert_ne!(after.biases[0], before.biases[0]);
}

#[test]
fn test_train_rejects_bad_batches() {
    let mut network = network(OptimizerKind::Sgd, 7);
    let before = network.parameters();

    assert!(matches!(
        network.train(states().view(), &[0, 2, 0, 0], Array1::zeros(4).view()),
        Err(DqnError::InvalidAction { action: 2, max_actions: 2 })
    ));
    assert!(matches!(
        network.train(states().view(), &[0, 1], Array1::zeros(4).view()),
        Err(DqnError::DimensionMismatch { .. })
    ));
    assert!(network
        .train(Array2::zeros((0, 3)).view(), &[], Array1::zeros(0).view())
        .is_err());
    assert_eq!(network.parameters(), before);
}

#[test]
fn test_learning_rate_option() {
    let mut network = network(OptimizerKind::Sgd, 0);
    network.set_option(NetOption::LearningRate, 0.5).unwrap();
    assert_eq!(network.option(NetOption::LearningRate), 0.5);
    network.set_option(NetOption::LearningRate, 0.0).unwrap();

    assert!(network.set_option(NetOption::LearningRate, -1.0).is_err());
    assert!(network.set_option(NetOption::LearningRate, f32::NAN).is_err());
    assert_eq!(network.option(NetOption::LearningRate), 0.0);
}

#[test]
fn test_zero_learning_rate_freezes_parameters() {
    let mut network = network(OptimizerKind::Sgd, 8);
    network.set_option(NetOption::LearningRate, 0.0).unwrap();
    let before = network.parameters();
    network
        .train(states().view(), &[0, 1, 0, 1], array![9.0, 9.0, 9.0, 9.0].view())
        .unwrap();
    assert_eq!(network.parameters(), before);
}

#[test]
fn test_sync_copies_without_aliasing() {
    let mut actor = network(OptimizerKind::Sgd, 9);
    let mut target = network(OptimizerKind::Sgd, 10);
    assert_ne!(actor.parameters(), target.parameters());

    target.sync_from(&actor).unwrap();
    assert_eq!(actor.parameters(), target.parameters());
    let synced = target.parameters();

    actor
        .train(states().view(), &[0, 1, 0, 1], array![1.0, 2.0, 3.0, 4.0].view())
        .unwrap();
    assert_eq!(target.parameters(), synced);
    assert_ne!(actor.parameters(), target.parameters());
}

#[test]
fn test_sync_rejects_other_architecture() {
    let actor = network(OptimizerKind::Sgd, 0);
    let mut rng = StdRng::seed_from_u64(0);
    let mut other = Architecture::new(&[3], 2)
        .hidden_sizes(&[4])
        .build(OptimizerKind::Sgd, 0.9, 0.01, &mut rng)
        .unwrap();
    assert!(other.sync_from(&actor).is_err());
}

#[test]
fn test_set_parameters_is_atomic() {
    let mut network = network(OptimizerKind::Sgd, 11);
    let before = network.parameters();

    let mut broken = zeroed(&before);
    broken.insert("layer1/biases".to_string(), Array1::<f32>::zeros(5).into_dyn());
    assert!(network.set_parameters(&broken).is_err());
    assert_eq!(network.parameters(), before);

    let mut missing = zeroed(&before);
    missing.remove("layer0/weights");
    assert!(network.set_parameters(&missing).is_err());
    assert_eq!(network.parameters(), before);
}

#[test]
fn test_parameters_are_deep_copies() {
    let mut network = network(OptimizerKind::Sgd, 12);
    let mut snapshot = network.parameters();
    for tensor in snapshot.values_mut() {
        tensor.fill(7.0);
    }
    assert_ne!(network.parameters(), snapshot);

    network.set_parameters(&snapshot).unwrap();
    snapshot.values_mut().for_each(|t| t.fill(0.0));
    assert!(network.layers()[0].weights.iter().all(|&w| w == 7.0));
}

#[test]
fn test_save_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let network = network(OptimizerKind::RmsProp, 13);
    let path = network.save(&dir.path().join("nested"), "model").unwrap();
    assert!(path.ends_with("nested/model.bin"));
    assert!(path.exists());

    let mut other = self::network(OptimizerKind::RmsProp, 14);
    other.load_parameters(&path).unwrap();
    assert_eq!(other.parameters(), network.parameters());

    let mut rng = StdRng::seed_from_u64(0);
    let restored = QNetwork::restore(&path, OptimizerKind::Adam, 0.9, 1e-3, &mut rng).unwrap();
    assert_eq!(restored.parameters(), network.parameters());
    assert_eq!(restored.optimizer_kind(), OptimizerKind::Adam);
}

#[test]
fn test_load_rejects_other_architecture() {
    let dir = tempfile::tempdir().unwrap();
    let network = network(OptimizerKind::Sgd, 0);
    let path = network.save(dir.path(), "model").unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let mut other = Architecture::new(&[3], 3)
        .hidden_sizes(&[8])
        .build(OptimizerKind::Sgd, 0.9, 0.01, &mut rng)
        .unwrap();
    assert!(matches!(
        other.load_parameters(&path),
        Err(DqnError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        other.load_parameters(&dir.path().join("missing.bin")),
        Err(DqnError::Io(_))
    ));
}

#[test]
fn test_value_propagates_nan() {
    let mut network = network(OptimizerKind::Sgd, 15);
    let mut parameters = network.parameters();
    if let Some(biases) = parameters.get_mut("layer1/biases") {
        biases[[0]] = f32::NAN;
    }
    network.set_parameters(&parameters).unwrap();

    let states = states();
    let values = network.values(states.view()).unwrap();
    assert!(values.column(0).iter().all(|v| v.is_nan()));
    assert!(values.column(1).iter().all(|v| v.is_finite()));

    let value = network.value(states.view()).unwrap();
    assert!(value.iter().all(|v| v.is_nan()));
    let choice = network.choice(states.view()).unwrap();
    assert!(choice.column(0).iter().all(|&c| c == 1.0));
}

#[test]
fn test_argmax_prefers_first_nan() {
    assert_eq!(argmax(array![1.0, f32::NAN, 3.0].view()), 1);
    assert_eq!(argmax(array![f32::NAN, 5.0].view()), 0);
    assert_eq!(argmax(array![2.0, f32::NAN, f32::NAN].view()), 1);
}

#[test]
fn test_load_rejects_same_size_other_shape() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let saved = Architecture::new(&[2, 3], 2)
        .hidden_sizes(&[4])
        .build(OptimizerKind::Sgd, 0.9, 0.01, &mut rng)
        .unwrap();
    let path = saved.save(dir.path(), "model").unwrap();

    let mut flat = Architecture::new(&[6], 2)
        .hidden_sizes(&[4])
        .build(OptimizerKind::Sgd, 0.9, 0.01, &mut rng)
        .unwrap();
    let before = flat.parameters();
    assert!(matches!(
        flat.load_parameters(&path),
        Err(DqnError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        flat.sync_from(&saved),
        Err(DqnError::DimensionMismatch { .. })
    ));
    assert_eq!(flat.parameters(), before);
}

#[test]
fn test_load_rejects_other_activation() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let saved = network(OptimizerKind::Sgd, 16);
    let path = saved.save(dir.path(), "model").unwrap();

    let mut tanh = Architecture::new(&[3], 2)
        .with_network(NetworkConfig {
            hidden_sizes: vec![8],
            activation: Activation::Tanh,
            init: None,
        })
        .build(OptimizerKind::Sgd, 0.9, 0.01, &mut rng)
        .unwrap();
    assert!(matches!(
        tanh.load_parameters(&path),
        Err(DqnError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_load_ignores_weight_init() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let saved = network(OptimizerKind::Sgd, 17);
    let path = saved.save(dir.path(), "model").unwrap();

    let mut zeros = Architecture::new(&[3], 2)
        .with_network(NetworkConfig {
            hidden_sizes: vec![8],
            init: Some(WeightInit::Zeros),
            ..NetworkConfig::default()
        })
        .build(OptimizerKind::Sgd, 0.9, 0.01, &mut rng)
        .unwrap();
    zeros.load_parameters(&path).unwrap();
    assert_eq!(zeros.parameters(), saved.parameters());
}

#[test]
fn test_save_replaces_previous_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let first = network(OptimizerKind::Sgd, 18);
    let second = network(OptimizerKind::Sgd, 19);

    first.save(dir.path(), "model").unwrap();
    let path = second.save(dir.path(), "model").unwrap();

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(files, vec![std::ffi::OsString::from("model.bin")]);

    let mut loaded = network(OptimizerKind::Sgd, 20);
    loaded.load_parameters(&path).unwrap();
    assert_eq!(loaded.parameters(), second.parameters());
}
