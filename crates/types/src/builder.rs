//! # メッセージ構築
//!
//! 値生成ポリシーに従ってデータポイント列を生成し、ラベルと束ねて
//! メッセージを作る。タグはUUIDv7（ミリ秒精度のタイムスタンプ +
//! ランダム成分）で生成し、バッチ内の衝突を実用上不可能にする。

use rand::Rng;
use uuid::Uuid;

use crate::{DataPoint, Label, Message, ValidationError};

/// 値生成ポリシー。
///
/// 浮動小数点ポリシーではサンプルをスケール倍して整数に切り捨てる。
/// スケール係数はメッセージに保持され、サーバー側が切り捨てを復元できる
/// ようにリクエストへ同梱される。
#[derive(Debug, Clone, PartialEq)]
pub enum ValuePolicy {
    /// `[min, max)` の一様整数
    Integer {
        /// 下限（含む）
        min: u64,
        /// 上限（含まない）
        max: u64,
    },
    /// `[0, domain)` の一様浮動小数点をスケール倍し切り捨て
    Float {
        /// サンプルの上限（含まない）
        domain: f64,
        /// 整数化のためのスケール係数
        scale: u64,
    },
}

impl ValuePolicy {
    /// リクエストに同梱するスケール係数。整数ポリシーでは1。
    pub fn scale(&self) -> u64 {
        match self {
            ValuePolicy::Integer { .. } => 1,
            ValuePolicy::Float { scale, .. } => *scale,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ValuePolicy::Integer { min, max } if min >= max => Err(
                ValidationError::InvalidRange(format!("[{min}, {max}) は空区間です")),
            ),
            ValuePolicy::Float { domain, .. } if !(*domain > 0.0) => Err(
                ValidationError::InvalidRange(format!("ドメイン {domain} は正である必要があります")),
            ),
            ValuePolicy::Float { scale, .. } if *scale == 0 => Err(
                ValidationError::InvalidRange("スケールは1以上である必要があります".to_string()),
            ),
            _ => Ok(()),
        }
    }

    fn draw(&self, rng: &mut impl Rng) -> u64 {
        match self {
            ValuePolicy::Integer { min, max } => rng.gen_range(*min..*max),
            ValuePolicy::Float { domain, scale } => {
                let sample: f64 = rng.gen_range(0.0..*domain);
                (sample * *scale as f64) as u64
            }
        }
    }
}

/// `n` 個のデータポイントを持つメッセージを構築する。
///
/// `n == 0` は拒否する。各データポイントの値は `policy` に従って抽選し、
/// タグはUUIDv7で採番する。ラベルは設定入力としてそのままコピーされる。
pub fn build_message(
    n: usize,
    policy: &ValuePolicy,
    label: &Label,
) -> Result<Message, ValidationError> {
    if n == 0 {
        return Err(ValidationError::EmptyBatch);
    }
    policy.validate()?;

    let mut rng = rand::thread_rng();
    let mut points = Vec::with_capacity(n);
    for _ in 0..n {
        points.push(DataPoint {
            value: policy.draw(&mut rng),
            tag: Uuid::now_v7().to_string(),
        });
    }

    Ok(Message {
        label: label.clone(),
        points,
        scale: policy.scale(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn test_label() -> Label {
        Label::new("test.db", "12345").unwrap()
    }

    /// 長さ0のバッチが拒否されることを確認する
    #[test]
    fn test_build_rejects_zero_points() {
        let policy = ValuePolicy::Integer { min: 2, max: 40 };
        assert!(matches!(
            build_message(0, &policy, &test_label()),
            Err(ValidationError::EmptyBatch)
        ));
    }

    /// 空区間の整数ポリシーが拒否されることを確認する
    #[test]
    fn test_build_rejects_empty_range() {
        let policy = ValuePolicy::Integer { min: 40, max: 40 };
        assert!(matches!(
            build_message(3, &policy, &test_label()),
            Err(ValidationError::InvalidRange(_))
        ));
    }

    /// 整数ポリシーの値が指定区間に収まることを確認する
    #[test]
    fn test_integer_values_in_range() {
        let policy = ValuePolicy::Integer { min: 2, max: 40 };
        let message = build_message(100, &policy, &test_label()).unwrap();
        assert!(message.values().all(|v| (2..40).contains(&v)));
        assert_eq!(message.scale, 1);
    }

    /// 浮動小数点ポリシーの値がスケール後のドメインに収まることを確認する
    #[test]
    fn test_float_values_scaled_and_truncated() {
        let policy = ValuePolicy::Float { domain: 35.0, scale: 100 };
        let message = build_message(100, &policy, &test_label()).unwrap();
        assert!(message.values().all(|v| v < 3500));
        assert_eq!(message.scale, 100);
    }

    /// n ∈ [1, 200] でタグが同一メッセージ内で衝突しないことを確認する
    #[test]
    fn test_tags_unique_within_batch() {
        let policy = ValuePolicy::Integer { min: 2, max: 40 };
        for n in [1usize, 2, 17, 64, 200] {
            let message = build_message(n, &policy, &test_label()).unwrap();
            let tags: HashSet<&str> = message.tags().collect();
            assert_eq!(tags.len(), n, "n={n} でタグが衝突しました");
        }
    }

    /// タグがUUIDv7（時刻成分 + ランダム成分）であることを確認する
    #[test]
    fn test_tags_are_uuid_v7() {
        let policy = ValuePolicy::Integer { min: 2, max: 40 };
        let message = build_message(10, &policy, &test_label()).unwrap();
        for tag in message.tags() {
            let parsed = Uuid::parse_str(tag).unwrap();
            assert_eq!(parsed.get_version_num(), 7);
        }
    }

    /// ラベルがメッセージへそのままコピーされることを確認する
    #[test]
    fn test_label_copied_verbatim() {
        let policy = ValuePolicy::Integer { min: 2, max: 40 };
        let label = test_label();
        let message = build_message(3, &policy, &label).unwrap();
        assert_eq!(message.label, label);
    }
}
