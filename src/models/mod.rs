//! 数据模型模块
//! 银行 API 的请求与响应结构（JSON 字段采用 camelCase，资金指令字段采用 snake_case）

pub mod account;
pub mod admin;
pub mod auth;
pub mod kyc;
pub mod mfa;

pub use account::*;
pub use admin::*;
pub use auth::*;
pub use kyc::*;
pub use mfa::*;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Error envelope returned by the banking API: `{"error": {"code", "message"}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Paginated list response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Paginated<T> {
    /// 总页数（page_size 为 0 时视为 1 页）
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(u64::from(self.page_size)).max(1)
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Page selector sent as `page` / `pageSize` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// 以最小货币单位表示的金额
///
/// 服务端可能以 JSON 数字或数字字符串返回；发送时总是序列化为字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct MinorUnits(pub i64);

impl MinorUnits {
    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl From<i64> for MinorUnits {
    fn from(v: i64) -> Self {
        MinorUnits(v)
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MinorUnits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MinorUnits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Ok(MinorUnits(v)),
            Raw::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(MinorUnits)
                .map_err(|_| serde::de::Error::custom(format!("invalid minor amount: {s:?}"))),
        }
    }
}
