//! 向量相关的基础运算

/// 原地进行 L2 归一化
///
/// 模长为 0 时保持原样，不做除法
pub fn normalize_l2(vec: &mut [f32]) {
    let norm = l2_norm(vec);
    if norm == 0.0 {
        return;
    }
    let norm = norm as f32;
    for v in vec.iter_mut() {
        *v /= norm;
    }
}

/// 按值版本的 [`normalize_l2`]
pub fn normalized(mut vec: Vec<f32>) -> Vec<f32> {
    normalize_l2(&mut vec);
    vec
}

/// 向量的 L2 模长，使用 f64 累加
pub fn l2_norm(vec: &[f32]) -> f64 {
    vec.iter().map(|&v| (v as f64) * (v as f64)).sum::<f64>().sqrt()
}

/// 余弦距离 `1 - cos(a, b)`，范围为 [0, 2]
///
/// 任意一方为零向量时，距离定义为 1.0（即相似度 0%）
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector dimension mismatch");
    let mut dot = 0f64;
    let mut na = 0f64;
    let mut nb = 0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    let cos = (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0);
    (1.0 - cos) as f32
}

/// 将余弦距离换算为相似度百分比，保留两位小数
pub fn similarity_percent(cosine_distance: f32) -> f64 {
    let percent = (1.0 - cosine_distance as f64) * 100.0;
    (percent * 100.0).round() / 100.0
}
