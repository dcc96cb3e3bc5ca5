use std::rc::Rc;

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use expr_util::eval::Bindings;
use expr_util::expr::DType;
use expr_util::noise::RngNoise;

use q_graph::elbo::{gather_stochastic_inputs, total_entropy};
use q_graph::graph::ModelNode;
use q_graph::{Error, GaussianQ, ObservedQ, QDistribution};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// With the warm-start log-stddev (−10), a Gaussian posterior is a
/// near-point-mass: the empirical moments over many reparameterized
/// draws must recover the mean and exp(2·log_stddev).
#[test]
fn gaussian_sample_moments_recover_the_parameters() {
    init_logging();
    let mut noise = RngNoise::from_rng(StdRng::seed_from_u64(101));

    let latent = ModelNode::latent("theta", &[3], DType::F64);
    let gauss = Rc::new(GaussianQ::new(&[3], &mut noise).unwrap());
    latent.attach_q(gauss.clone()).unwrap();

    let q = latent.q_distribution().unwrap();
    let num_draws = 1000;
    let mut sum = Array1::<f64>::zeros(3);
    let mut sum_sq = Array1::<f64>::zeros(3);
    for _ in 0..num_draws {
        let bindings = q.sample_stochastic_inputs(&mut noise).unwrap();
        let s = q.sample().eval(&bindings).unwrap();
        for (i, &v) in s.iter().enumerate() {
            sum[i] += v;
            sum_sq[i] += v * v;
        }
    }

    let mean = gauss.mean().value();
    let expected_var = (2.0f64 * -10.0).exp();
    for i in 0..3 {
        let emp_mean = sum[i] / num_draws as f64;
        let emp_var = sum_sq[i] / num_draws as f64 - emp_mean * emp_mean;
        assert_abs_diff_eq!(emp_mean, mean[[i]], epsilon = 1e-4);
        assert!((emp_var - expected_var).abs() < 0.5 * expected_var);
    }
}

/// Transpose of a Gaussian matrix latent: the derived distribution
/// reports the flipped shape and its sample is the structural transpose
/// of the parent's sample under every paired noise draw.
#[test]
fn transpose_transform_tracks_the_parent() {
    init_logging();
    let mut noise = RngNoise::seeded(202);

    let theta = ModelNode::latent("theta", &[3, 4], DType::F64);
    theta
        .attach_q(Rc::new(GaussianQ::new(&[3, 4], &mut noise).unwrap()))
        .unwrap();
    let theta_t = ModelNode::transpose("theta_t", &theta).unwrap();

    let parent_q = theta.q_distribution().unwrap();
    let derived_q = theta_t.q_distribution().unwrap();
    assert_eq!(derived_q.output_shape(), &[4, 3]);

    for _ in 0..10 {
        let bindings = parent_q.sample_stochastic_inputs(&mut noise).unwrap();
        let parent_sample = parent_q.sample().eval(&bindings).unwrap();
        let derived_sample = derived_q.sample().eval(&bindings).unwrap();
        assert_abs_diff_eq!(
            derived_sample,
            parent_sample.reversed_axes(),
            epsilon = 1e-12
        );
    }
}

/// One evaluation step over a mixed model: entropy bonus comes from the
/// Gaussian latent alone, and the gathered bindings suffice to evaluate
/// every node's sample.
#[test]
fn elbo_assembly_over_a_mixed_graph() {
    init_logging();
    let mut noise = RngNoise::seeded(303);

    let data = Array::random((3, 4), ndarray_rand::rand_distr::Uniform::new(0.0, 1.0));
    let x = ModelNode::latent("x", &[3, 4], DType::F64);
    x.attach_q(Rc::new(ObservedQ::new(data.into_dyn()))).unwrap();

    let theta = ModelNode::latent("theta", &[3, 4], DType::F64);
    theta
        .attach_q(Rc::new(GaussianQ::new(&[3, 4], &mut noise).unwrap()))
        .unwrap();
    let theta_t = ModelNode::transpose("theta_t", &theta).unwrap();

    let nodes = vec![x, theta.clone(), theta_t.clone()];

    let entropy = total_entropy(&nodes).unwrap();
    let bindings = gather_stochastic_inputs(&nodes, &mut noise).unwrap();
    assert_eq!(bindings.len(), 1); // only the Gaussian draws noise

    let gauss_entropy = theta
        .q_distribution()
        .unwrap()
        .entropy()
        .unwrap()
        .eval(&Bindings::new())
        .unwrap()
        .sum();
    assert_abs_diff_eq!(
        entropy.eval(&bindings).unwrap().sum(),
        gauss_entropy,
        epsilon = 1e-10
    );

    for node in &nodes {
        let q = node.q_distribution().unwrap();
        let sample = q.sample().eval(&bindings).unwrap();
        assert_eq!(sample.shape(), q.output_shape());
    }
}

/// Construction-order misuse surfaces the documented errors.
#[test]
fn ordering_and_attachment_errors() {
    init_logging();
    let mut noise = RngNoise::seeded(404);

    let theta = ModelNode::latent("theta", &[2, 2], DType::F64);
    let theta_t = ModelNode::transpose("theta_t", &theta).unwrap();

    // transform queried before the root latent has a distribution
    assert!(matches!(
        theta_t.q_distribution(),
        Err(Error::UnresolvedAncestor { .. })
    ));

    // explicit attachment to the transform is refused outright
    let q: Rc<dyn QDistribution> = Rc::new(GaussianQ::new(&[2, 2], &mut noise).unwrap());
    assert!(matches!(
        theta_t.attach_q(q.clone()),
        Err(Error::InvalidAttachment { .. })
    ));

    // fixing the order resolves both
    theta.attach_q(q).unwrap();
    assert!(theta_t.q_distribution().is_ok());
}
