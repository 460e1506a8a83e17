use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// 页码
///
/// 所有按页索引的映射都以它为键（序列化为字符串）。
/// 整数与数字字符串会被规范化：`4`、`"4"`、`" 04 "` 都是 `"4"`。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageNumber(String);

impl PageNumber {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        match trimmed.parse::<u64>() {
            Ok(n) => Self(n.to_string()),
            Err(_) => Self(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 数字页码
    pub fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl From<u64> for PageNumber {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<&str> for PageNumber {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// 数字页码按数值排序并排在非数字页码之前
impl Ord for PageNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for PageNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for PageNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PageNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_int(deserializer).map(PageNumber::new)
    }
}

/// 反序列化字符串或整数为 String（后端导出的 id / 页码两种形式都有）
pub fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;

    struct StringOrIntVisitor;

    impl<'de> Visitor<'de> for StringOrIntVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value.fract() == 0.0 && value >= 0.0 {
                Ok((value as u64).to_string())
            } else {
                Err(E::custom(format!("invalid integer: {}", value)))
            }
        }
    }

    deserializer.deserialize_any(StringOrIntVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_normalization() {
        assert_eq!(PageNumber::new(" 04 "), PageNumber::from(4));
        assert_eq!(PageNumber::new("iv").as_str(), "iv");
        assert_eq!(PageNumber::from(7).as_number(), Some(7));
    }

    #[test]
    fn test_deserialize_string_or_int() {
        let pages: Vec<PageNumber> = serde_json::from_str(r#"[4, "7", "012", 3.0]"#).unwrap();
        assert_eq!(
            pages,
            vec![
                PageNumber::from(4),
                PageNumber::from(7),
                PageNumber::from(12),
                PageNumber::from(3)
            ]
        );
    }

    #[test]
    fn test_map_keys_are_strings_and_numeric_order() {
        let mut map = BTreeMap::new();
        map.insert(PageNumber::from(10), 1);
        map.insert(PageNumber::from(4), 2);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"4":2,"10":1}"#);

        let back: BTreeMap<PageNumber, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
