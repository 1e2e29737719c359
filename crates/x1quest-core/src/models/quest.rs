use serde::{Deserialize, Serialize};

/// Quest grouping as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestCategory {
    Social,
    Onchain,
    Other(String),
}

impl From<String> for QuestCategory {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "social" => QuestCategory::Social,
            "onchain" => QuestCategory::Onchain,
            _ => QuestCategory::Other(s),
        }
    }
}

impl From<QuestCategory> for String {
    fn from(c: QuestCategory) -> Self {
        match c {
            QuestCategory::Social => "social".to_string(),
            QuestCategory::Onchain => "onchain".to_string(),
            QuestCategory::Other(s) => s,
        }
    }
}

/// How often a quest can be completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Periodicity {
    Daily,
    OneTime,
    Other(String),
}

impl From<String> for Periodicity {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "daily" => Periodicity::Daily,
            "one_time" => Periodicity::OneTime,
            _ => Periodicity::Other(s),
        }
    }
}

impl From<Periodicity> for String {
    fn from(p: Periodicity) -> Self {
        match p {
            Periodicity::Daily => "daily".to_string(),
            Periodicity::OneTime => "one_time".to_string(),
            Periodicity::Other(s) => s,
        }
    }
}

impl Default for Periodicity {
    fn default() -> Self {
        Periodicity::Other(String::new())
    }
}

impl Default for QuestCategory {
    fn default() -> Self {
        QuestCategory::Other(String::new())
    }
}

// Quest as listed by GET /quests
// Note: API returns id as either string or number, and sends `null` for
// fields it has no value for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub reward: f64,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub category: QuestCategory,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub periodicity: Periodicity,
    #[serde(rename = "type", default)]
    pub quest_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub is_completed: bool,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub is_completed_today: bool,
    #[serde(default, deserialize_with = "deserialize_optional_count")]
    pub total_completions: Option<i64>,
}

impl Quest {
    pub fn is_daily(&self) -> bool {
        self.periodicity == Periodicity::Daily
    }

    pub fn is_social(&self) -> bool {
        self.category == QuestCategory::Social
    }
}

// Helper to deserialize a string or number id as String
pub(crate) fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StringOrNumberVisitor;

    impl<'de> de::Visitor<'de> for StringOrNumberVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

/// `null` becomes the type's default, same as an absent key
pub(crate) fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Helper to deserialize a number, numeric string or null as f64
pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct AmountVisitor;

    impl<'de> de::Visitor<'de> for AmountVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number, numeric string or null")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(0.0);
            }
            v.parse::<f64>()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(0.0)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

// Helper for optional counters that may arrive as float, string or null
pub(crate) fn deserialize_optional_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let amount = deserialize_optional_amount(deserializer)?;
    Ok(amount.filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
}

fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Amount(#[serde(deserialize_with = "deserialize_amount")] f64);

    Ok(Option::<Amount>::deserialize(deserializer)?.map(|a| a.0))
}
