use crate::db::{ImageRecord, NeighborResult};

/// 默认入库阈值，相似度达到该值的图片视为重复
pub const DEFAULT_THRESHOLD: f64 = 90.0;

/// 去重判定结果
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// 允许入库
    Admit,
    /// 与已有图片过于相似
    Reject { record: ImageRecord, similarity: f64 },
}

impl Decision {
    pub fn is_admit(&self) -> bool {
        matches!(self, Self::Admit)
    }
}

/// 根据 top-1 最近邻结果判定是否入库
///
/// 只看第一个结果；相似度等于阈值时同样拒绝
pub fn decide(neighbors: &[NeighborResult], threshold: f64) -> Decision {
    match neighbors.first() {
        Some(top) if top.similarity_percent >= threshold => Decision::Reject {
            record: top.record.clone(),
            similarity: top.similarity_percent,
        },
        _ => Decision::Admit,
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    fn neighbor(similarity_percent: f64) -> NeighborResult {
        NeighborResult {
            record: ImageRecord {
                id: 7,
                name: "old.jpg".to_string(),
                path: "/storage/images/old.jpg".to_string(),
                embedding: vec![],
            },
            cosine_distance: (1.0 - similarity_percent / 100.0) as f32,
            similarity_percent,
        }
    }

    #[rstest]
    #[case(0.0)]
    #[case(50.0)]
    #[case(90.0)]
    #[case(100.0)]
    fn test_empty_always_admits(#[case] threshold: f64) {
        assert_eq!(decide(&[], threshold), Decision::Admit);
    }

    #[rstest]
    #[case::below(89.99, true)]
    #[case::equal(90.00, false)]
    #[case::above(90.01, false)]
    #[case::identical(100.0, false)]
    #[case::unrelated(3.5, true)]
    fn test_threshold_boundary(#[case] similarity: f64, #[case] admit: bool) {
        let decision = decide(&[neighbor(similarity)], DEFAULT_THRESHOLD);
        assert_eq!(decision.is_admit(), admit);
    }

    #[test]
    fn test_reject_carries_match() {
        match decide(&[neighbor(97.5)], 90.0) {
            Decision::Reject { record, similarity } => {
                assert_eq!(record.id, 7);
                assert_eq!(record.name, "old.jpg");
                assert_eq!(similarity, 97.5);
            }
            Decision::Admit => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_only_top_is_consulted() {
        let neighbors = [neighbor(10.0), neighbor(99.0)];
        assert!(decide(&neighbors, 90.0).is_admit());
    }

    #[test]
    fn test_custom_threshold() {
        assert!(!decide(&[neighbor(60.0)], 50.0).is_admit());
        assert!(decide(&[neighbor(60.0)], 60.01).is_admit());
    }
}
