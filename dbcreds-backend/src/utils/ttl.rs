//! TTL 序列化/反序列化工具
//!
//! 存储层中的 TTL 一律以整数秒表示：
//! - 序列化: `Duration` -> 秒数 (u64)
//! - 反序列化: 秒数 (u64) 或带单位的字符串 (`"90s"`, `"15m"`, `"1h"`) -> `Duration`

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// 序列化 `Duration` 为秒数（向下取整）
pub fn serialize<S>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(ttl.as_secs())
}

/// 反序列化：支持秒数或带单位字符串
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTtl {
        Secs(u64),
        Text(String),
    }

    match RawTtl::deserialize(deserializer)? {
        RawTtl::Secs(secs) => Ok(Duration::from_secs(secs)),
        RawTtl::Text(text) => {
            parse_ttl(&text).ok_or_else(|| Error::custom(format!("Invalid TTL: {text:?}")))
        }
    }
}

/// `Option<Duration>` 版本，用于可选 TTL 字段（如 `max_ttl`）
pub mod option {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ttl: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ttl {
            Some(ttl) => serializer.serialize_some(&ttl.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super")] Duration);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(ttl)| ttl))
    }
}

/// 解析带单位的 TTL 字符串；无单位时按秒处理
fn parse_ttl(text: &str) -> Option<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };
    value.checked_mul(multiplier).map(Duration::from_secs)
}
