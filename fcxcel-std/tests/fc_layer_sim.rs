use fcxcel::*;
use fcxcel_std::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logger() { let _ = env_logger::builder().is_test(true).try_init(); }

/// Runs `msgs` through a fresh accelerator. Source and sink wait `delay + 3` cycles before the
/// first transfer and `delay` cycles between transfers.
fn run(config: FcLayerConfig, msgs: &[u32], src_delay: usize, sink_delay: usize) -> Result<SimStats, SimError> {
    init_logger();
    let (inputs, outputs) = split_msgs(msgs);
    let mut dut = FcLayer::new(config).unwrap();
    let mut src = StreamSource::new(inputs, src_delay + 3, src_delay);
    let mut sink = StreamSink::new(outputs, sink_delay + 3, sink_delay);
    run_sim(&mut dut, &mut src, &mut sink, 10_000)
}

/// Programs a fresh accelerator with `layer`, streams `batches` through it with the consumer always
/// ready, and returns the outputs one row per batch.
fn run_layer(config: FcLayerConfig, layer: &DenseLayer, batches: &[Vec<i64>]) -> Vec<Vec<i64>> {
    let weights = layer
        .weights
        .iter()
        .enumerate()
        .flat_map(|(k, row)| row.iter().enumerate().map(move |(j, &w)| mk_weight_msg(k, j, w)));
    let biases = layer.biases.iter().enumerate().map(|(j, &b)| mk_bias_msg(j, b));
    let batch_size = config.batch_size;
    let inputs = batches
        .iter()
        .enumerate()
        .flat_map(|(n, batch)| batch.iter().enumerate().map(move |(k, &x)| mk_input_msg(n % batch_size, k, x)));
    let mut words = weights.chain(biases).chain(inputs).peekable();

    let mut dut = FcLayer::new(config).unwrap();
    let mut outputs = Vec::new();
    for _ in 0..100_000 {
        if words.peek().is_none() && dut.pending_len() == 0 {
            break;
        }
        let fwd = Valid::from(words.peek().copied());
        let (out, bwd) = dut.step(fwd, Ready::new(true));
        if fwd.fire(bwd) {
            let _ = words.next();
        }
        if let Some(word) = out.into_option() {
            match Message::decode(word) {
                Message::OutputData(data) => outputs.push(data),
                msg => panic!("unexpected {}", msg),
            }
        }
    }

    outputs
        .chunks(config.output_channel)
        .enumerate()
        .map(|(n, row)| {
            row.iter()
                .enumerate()
                .map(|(j, data)| {
                    assert_eq!((data.batch_idx.index(), data.channel_idx.index()), (n % config.batch_size, j));
                    data.value.raw()
                })
                .collect()
        })
        .collect()
}

/// Runs `layers` one after another on the accelerator, rectifying between layers.
fn run_mlp(batch_size: usize, layers: &[DenseLayer], inputs: &[Vec<i64>], frac_bits: u32) -> Vec<Vec<i64>> {
    let mut activations = inputs.to_vec();
    for (n, layer) in layers.iter().enumerate() {
        let config = FcLayerConfig::new(batch_size, layer.input_channel(), layer.output_channel())
            .with_frac_bits(frac_bits)
            .with_rounding(Rounding::HalfUp);
        activations = run_layer(config, layer, &activations);
        if n + 1 < layers.len() {
            activations.iter_mut().flatten().for_each(|y| *y = relu(*y));
        }
    }
    activations
}

fn random_layer(rng: &mut StdRng, input_channel: usize, output_channel: usize) -> DenseLayer {
    DenseLayer {
        weights: (0..input_channel)
            .map(|_| (0..output_channel).map(|_| rng.random_range(-128..=128)).collect())
            .collect(),
        biases: (0..output_channel).map(|_| rng.random_range(-256..=256)).collect(),
    }
}

fn small_fc_msgs() -> Vec<u32> {
    vec![
        // Weights [[1, 2], [3, 4], [5, 6]]
        mk_weight_msg(0, 0, 1),
        mk_weight_msg(0, 1, 2),
        mk_weight_msg(1, 0, 3),
        mk_weight_msg(1, 1, 4),
        mk_weight_msg(2, 0, 5),
        mk_weight_msg(2, 1, 6),
        // Biases [10, 20]
        mk_bias_msg(0, 10),
        mk_bias_msg(1, 20),
        // Batch 0: [1, 2, 3]
        mk_input_msg(0, 0, 1),
        mk_input_msg(0, 1, 2),
        mk_input_msg(0, 2, 3),
        mk_output_msg(0, 0, 32),
        mk_output_msg(0, 1, 48),
        // Batch 1: [4, 5, 6]
        mk_input_msg(1, 0, 4),
        mk_input_msg(1, 1, 5),
        mk_input_msg(1, 2, 6),
        mk_output_msg(1, 0, 59),
        mk_output_msg(1, 1, 84),
    ]
}

fn dropped_config_msgs() -> Vec<u32> {
    let mut msgs = small_fc_msgs();
    let inputs = msgs.split_off(8);
    msgs.extend([mk_weight_msg(3, 0, 100), mk_weight_msg(0, 2, 100), mk_bias_msg(2, 100)]);
    msgs.extend([mk_input_msg(2, 0, 100), mk_input_msg(0, 3, 100)]);
    msgs.extend(inputs);
    msgs
}

fn reconfig_msgs() -> Vec<u32> {
    let mut msgs = small_fc_msgs();
    msgs.extend([
        mk_weight_msg(0, 0, 2),
        mk_bias_msg(1, -20),
        mk_input_msg(0, 0, 1),
        mk_input_msg(0, 1, 2),
        mk_input_msg(0, 2, 3),
        mk_output_msg(0, 0, 33),
        mk_output_msg(0, 1, 8),
    ]);
    msgs
}

#[test]
fn test_case_table() {
    let integer = FcLayerConfig::new(2, 3, 2).with_frac_bits(0);
    let cases: [(&str, fn() -> Vec<u32>); 3] =
        [("small_fc", small_fc_msgs), ("dropped_config", dropped_config_msgs), ("reconfig", reconfig_msgs)];
    for (name, msgs) in cases {
        for (src_delay, sink_delay) in [(0, 0), (3, 0), (0, 3), (3, 5), (7, 1)] {
            let stats = run(integer, &msgs(), src_delay, sink_delay)
                .unwrap_or_else(|e| panic!("{} (src {}, sink {}): {}", name, src_delay, sink_delay, e));
            assert!(stats.transfers_out >= 4, "{}", name);
        }
    }
}

#[test]
fn batches_beyond_batch_size_reuse_slots() {
    let config = FcLayerConfig::new(2, 4, 3);
    let tv = TestVector::random(config, 7, -500..=500, &mut StdRng::seed_from_u64(1)).unwrap();
    let mut msgs = tv.input_msgs();
    msgs.extend(tv.output_msgs());
    let stats = run(config, &msgs, 1, 2).unwrap();
    assert_eq!(stats.transfers_in, 4 * 3 + 3 + 7 * 4);
    assert_eq!(stats.transfers_out, 7 * 3);
}

#[test]
fn mnist_sized_layer() {
    let config = FcLayerConfig::new(8, 32, 32);
    let tv = TestVector::random(config, 8, -256..=256, &mut StdRng::seed_from_u64(6745)).unwrap();
    let mut msgs = tv.input_msgs();
    msgs.extend(tv.output_msgs());
    let stats = run(config, &msgs, 0, 0).unwrap();
    assert_eq!(stats.transfers_out, 8 * 32);
}

#[test]
fn systolic_array_matches_fl_model() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let config = FcLayerConfig::new(4, rng.random_range(1..=8), rng.random_range(1..=8)).with_frac_bits(0);
        let tv = TestVector::random(config, 4, -8..=8, &mut rng).unwrap();
        let weights =
            tv.weights.iter().map(|row| row.iter().map(|&w| w as i32 as u32).collect::<Vec<_>>()).collect::<Vec<_>>();
        let sums = tv.biases.iter().map(|&b| b as i32 as u32).collect::<Vec<_>>();
        let expected = tv
            .batches
            .iter()
            .map(|batch| {
                let acts = batch.iter().map(|&x| x as i32 as u32).collect::<Vec<_>>();
                systolic_array(&weights, &acts, &sums).into_iter().map(|y| i64::from(y as i32)).collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        assert_eq!(tv.expected(), expected);

        let mut msgs = tv.input_msgs();
        msgs.extend(tv.output_msgs());
        run(config, &msgs, 0, 1).unwrap();
    }
}

#[test]
fn q4_7_tracks_float_reference() {
    let mut rng = StdRng::seed_from_u64(2025);
    let config = FcLayerConfig::new(4, 8, 4);
    let mut uniform = |n: usize| (0..n).map(|_| rng.random_range(-1.0f32..=1.0)).collect::<Vec<_>>();
    let weights = (0..8).map(|_| uniform(4)).collect::<Vec<_>>();
    let biases = uniform(4);
    let batches = (0..4).map(|_| uniform(8)).collect::<Vec<_>>();

    let tv = TestVector::from_f32(config, &weights, &biases, &batches).unwrap();
    let mut msgs = tv.input_msgs();
    msgs.extend(tv.output_msgs());
    run(config, &msgs, 0, 0).unwrap();

    let reference = fc_layer_f32(&batches, &weights, &biases);
    for (fixed, float) in tv.expected().iter().zip(&reference) {
        let float = float.iter().map(|&y| OutputValue::from_f32(y, config.frac_bits).raw()).collect::<Vec<_>>();
        assert!(within_tolerance(fixed, &float, EVAL_TOLERANCE), "{:?} vs {:?}", fixed, float);
    }
}

#[test]
fn mnist_small_layer_by_layer() {
    init_logger();
    let layers = vec![
        DenseLayer::from_f32(
            &[vec![0.1, 0.2, 0.3], vec![-0.1, 0.1, 0.2], vec![0.3, 0.1, 0.2], vec![0.2, 0.3, 0.1]],
            &[0.1; 3],
            7,
        ),
        DenseLayer::from_f32(&[vec![0.1, 0.2], vec![0.3, 0.1], vec![0.2, 0.3]], &[0.1, 0.2], 7),
        DenseLayer::from_f32(&[vec![0.1, 0.2], vec![0.3, 0.1]], &[0.1, 0.1], 7),
    ];
    let inputs = [[0.5, -0.3, 0.7, 0.1], [-0.5, 0.25, 0.0, 1.0]]
        .iter()
        .map(|x| x.iter().map(|&x| InputValue::from_f32(x, 7).raw()).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let out = run_mlp(2, &layers, &inputs, 7);
    assert_eq!(out, mlp_fixed(&inputs, &layers, 7));
    assert_eq!(out[0], vec![33, 26]);
    // Reference outputs 0.2523 and 0.1991, within 3 LSBs.
    assert!(within_tolerance(&out[0], &[32, 25], 3));
}

#[test]
fn random_mlp_layer_by_layer() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..10 {
        let dims = (0..4).map(|_| rng.random_range(1..=8)).collect::<Vec<usize>>();
        let layers = dims.windows(2).map(|d| random_layer(&mut rng, d[0], d[1])).collect::<Vec<_>>();
        let batch_size = rng.random_range(1..=4);
        let inputs = (0..rng.random_range(1..=6))
            .map(|_| (0..dims[0]).map(|_| rng.random_range(-256..=256)).collect())
            .collect::<Vec<Vec<i64>>>();
        assert_eq!(run_mlp(batch_size, &layers, &inputs, 7), mlp_fixed(&inputs, &layers, 7));
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 24, .. ProptestConfig::default() })]

    #[test]
    fn fl_model_matches_reference(
        batch_size in 1..=4usize,
        input_channel in 1..=6usize,
        output_channel in 1..=6usize,
        frac_bits in prop::sample::select(vec![0u32, 7, 8]),
        rounding in prop::sample::select(vec![Rounding::Floor, Rounding::HalfUp]),
        num_batches in 0..=6usize,
        seed in any::<u64>(),
        src_delay in 0..=3usize,
        sink_delay in 0..=3usize,
    ) {
        let config = FcLayerConfig::new(batch_size, input_channel, output_channel)
            .with_frac_bits(frac_bits)
            .with_rounding(rounding);
        let tv = TestVector::random(config, num_batches, i64::MIN..=i64::MAX, &mut StdRng::seed_from_u64(seed))
            .unwrap();
        let mut msgs = tv.input_msgs();
        msgs.extend(tv.output_msgs());
        let stats = run(config, &msgs, src_delay, sink_delay);
        prop_assert!(stats.is_ok(), "{:?}", stats);
    }

    #[test]
    fn trigger_fires_once_per_round(
        order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle(),
        rounds in 1..=3usize,
    ) {
        let mut dut = FcLayer::new(FcLayerConfig::new(1, 5, 2)).unwrap();
        let mut outputs = 0;
        for round in 0..rounds {
            for (n, &k) in order.iter().enumerate() {
                let (_, bwd) = dut.step(Valid::valid(mk_input_msg(0, k, 1)), Ready::new(true));
                prop_assert!(bwd.ready);
                prop_assert_eq!(dut.input_count(0), Some((n + 1) % 5));
                prop_assert_eq!(dut.pending_len(), if n == 4 { 2 } else { 0 });
            }
            while dut.step(Valid::invalid(), Ready::new(true)).0.valid {
                outputs += 1;
            }
            prop_assert_eq!(outputs, 2 * (round + 1));
        }
    }

    #[test]
    fn interleaved_slots_trigger_on_their_own_rounds(
        order in Just((0..3usize).flat_map(|b| (0..4usize).map(move |k| (b, k))).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let weights = vec![vec![1, -2], vec![3, 4], vec![-5, 6], vec![7, 8]];
        let biases = vec![10, -20];
        let mut dut = FcLayer::new(FcLayerConfig::new(3, 4, 2).with_frac_bits(0)).unwrap();
        for (k, row) in weights.iter().enumerate() {
            for (j, &w) in row.iter().enumerate() {
                let _ = dut.step(Valid::valid(mk_weight_msg(k, j, w)), Ready::new(true));
            }
        }
        for (j, &b) in biases.iter().enumerate() {
            let _ = dut.step(Valid::valid(mk_bias_msg(j, b)), Ready::new(true));
        }

        let value = |b: usize, k: usize| (b * 10 + k + 1) as i64;
        let mut counts = [0usize; 3];
        for (b, k) in order {
            let (_, bwd) = dut.step(Valid::valid(mk_input_msg(b, k, value(b, k))), Ready::new(true));
            prop_assert!(bwd.ready);
            counts[b] += 1;
            for slot in 0..3 {
                prop_assert_eq!(dut.input_count(slot), Some(counts[slot] % 4));
            }

            let mut out = Vec::new();
            while let Some(word) = dut.step(Valid::invalid(), Ready::new(true)).0.into_option() {
                out.push(word);
            }
            if counts[b] == 4 {
                let row = (0..4).map(|k| value(b, k)).collect::<Vec<_>>();
                let expected = fc_layer_fixed(&[row], &weights, &biases, 0, Rounding::Floor);
                let expected = expected[0].iter().enumerate().map(|(j, &y)| mk_output_msg(b, j, y)).collect::<Vec<_>>();
                prop_assert_eq!(out, expected);
            } else {
                prop_assert!(out.is_empty());
            }
        }
    }
}
