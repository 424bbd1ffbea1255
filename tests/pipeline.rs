use matrix_compute::{matmul, matmul_shared, GpuContext, Matrix, PipelineError};

const EPSILON: f32 = 1e-5;

/// Simple CPU matmul for checking results, fixed ascending-`t` accumulation
/// to match the kernel.
fn cpu_matmul(a: &Matrix, b: &Matrix) -> Matrix {
    assert_eq!(a.cols(), b.rows());
    let (m, k, n) = (a.rows(), a.cols(), b.cols());
    let mut out = vec![0.0f32; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0f32;
            for t in 0..k {
                sum += a.get(i, t) * b.get(t, j);
            }
            out[i * n + j] = sum;
        }
    }
    Matrix::new(m, n, out)
}

/// Returns the shared context, or `None` on machines with no compute-capable
/// adapter so GPU tests can skip instead of fail.
fn context() -> Option<&'static GpuContext> {
    match GpuContext::shared() {
        Ok(ctx) => Some(ctx),
        Err(PipelineError::DeviceUnavailable(msg)) => {
            eprintln!("skipping GPU test: {msg}");
            None
        }
        Err(e) => panic!("unexpected context error: {e}"),
    }
}

fn assert_close(actual: &Matrix, expected: &Matrix) {
    assert_eq!(actual.rows(), expected.rows());
    assert_eq!(actual.cols(), expected.cols());
    for (&a, &e) in actual.data().iter().zip(expected.data()) {
        assert!((a - e).abs() < EPSILON, "{a} != {e}");
    }
}

#[test]
fn multiplies_2x4_by_4x2() {
    let Some(ctx) = context() else { return };

    let a = Matrix::new(2, 4, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    let b = Matrix::new(4, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

    let c = matmul(ctx, &a, &b).expect("matmul failed");

    assert_eq!(c.rows(), 2);
    assert_eq!(c.cols(), 2);
    assert_close(&c, &Matrix::new(2, 2, vec![50.0, 60.0, 114.0, 140.0]));
}

#[test]
fn multiplies_1x1_scalars() {
    let Some(ctx) = context() else { return };

    let a = Matrix::new(1, 1, vec![5.0]);
    let b = Matrix::new(1, 1, vec![3.0]);

    let c = matmul(ctx, &a, &b).expect("matmul failed");
    assert_close(&c, &Matrix::new(1, 1, vec![15.0]));
}

#[test]
fn zero_operand_yields_zero_product() {
    let Some(ctx) = context() else { return };

    let a = Matrix::zeros(3, 4);
    let b = Matrix::new(4, 2, (1..=8).map(|v| v as f32).collect());

    let c = matmul(ctx, &a, &b).expect("matmul failed");
    assert_eq!((c.rows(), c.cols()), (3, 2));
    assert!(c.data().iter().all(|&v| v == 0.0));
}

#[test]
fn identity_is_neutral() {
    let Some(ctx) = context() else { return };

    let a = Matrix::from_rows(&[
        vec![1.25, -2.0, 3.5],
        vec![0.0, 4.75, -6.0],
    ]);
    let i = Matrix::identity(3);

    let c = matmul(ctx, &a, &i).expect("matmul failed");
    assert_close(&c, &a);
}

#[test]
fn single_term_products_when_k_is_one() {
    let Some(ctx) = context() else { return };

    // k = 1: the accumulation loop body runs exactly once per cell.
    let a = Matrix::new(3, 1, vec![2.0, -1.0, 0.5]);
    let b = Matrix::new(1, 2, vec![4.0, 8.0]);

    let c = matmul(ctx, &a, &b).expect("matmul failed");
    assert_close(&c, &cpu_matmul(&a, &b));
}

#[test]
fn matches_cpu_oracle_on_rectangular_inputs() {
    let Some(ctx) = context() else { return };

    let a = Matrix::new(3, 5, (0..15).map(|v| v as f32 * 0.5 - 3.0).collect());
    let b = Matrix::new(5, 4, (0..20).map(|v| (v as f32).sin()).collect());

    let c = matmul(ctx, &a, &b).expect("matmul failed");
    assert_close(&c, &cpu_matmul(&a, &b));
}

#[test]
fn repeated_runs_are_bit_identical() {
    let Some(ctx) = context() else { return };

    let a = Matrix::new(4, 3, (0..12).map(|v| (v as f32).exp().fract()).collect());
    let b = Matrix::new(3, 4, (0..12).map(|v| 1.0 / (v as f32 + 1.0)).collect());

    let first = matmul(ctx, &a, &b).expect("matmul failed");
    let second = matmul(ctx, &a, &b).expect("matmul failed");

    // Fixed accumulation order makes reruns reproducible down to the bit.
    let first_bits: Vec<u32> = first.data().iter().map(|v| v.to_bits()).collect();
    let second_bits: Vec<u32> = second.data().iter().map(|v| v.to_bits()).collect();
    assert_eq!(first_bits, second_bits);
}

#[test]
fn shape_mismatch_is_an_error() {
    let a = Matrix::zeros(2, 3);
    let b = Matrix::zeros(4, 2);
    let expected = Err(PipelineError::ShapeMismatch { a_cols: 3, b_rows: 4 });

    // The shape check is pure, so this holds with or without an adapter.
    assert_eq!(matmul_shared(&a, &b), expected);

    if let Some(ctx) = context() {
        assert_eq!(matmul(ctx, &a, &b), expected);
    }
}
