// Sums run in f64 so large-magnitude f32 components cannot overflow to inf.

pub fn l2_norm(v: &[f32]) -> f64 {
    let mut sum = 0.0f64;
    for &x in v {
        let x = f64::from(x);
        sum += x * x;
    }
    sum.sqrt()
}

pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
    }
    dot
}

/// Cosine similarity with precomputed norms. Zero when either norm is zero.
pub fn cosine_similarity_with_norms(a: &[f32], b: &[f32], a_norm: f64, b_norm: f64) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let score = (dot(a, b) / (a_norm * b_norm)) as f32;
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity_with_norms(a, b, l2_norm(a), l2_norm(b))
}
