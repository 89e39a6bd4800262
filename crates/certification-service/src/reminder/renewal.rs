//! 续证链接
//!
//! 按厂商名称（不区分大小写）查找续证页面地址

use std::collections::HashMap;

use cert_shared::config::NotificationConfig;

#[derive(Debug, Clone, Default)]
pub struct RenewalLinks {
    by_vendor: HashMap<String, String>,
}

impl RenewalLinks {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            by_vendor: entries
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.into()))
                .collect(),
        }
    }

    pub fn lookup(&self, vendor: &str) -> Option<String> {
        self.by_vendor.get(&vendor.trim().to_lowercase()).cloned()
    }
}

impl From<&NotificationConfig> for RenewalLinks {
    fn from(config: &NotificationConfig) -> Self {
        Self::new(config.renewal_urls.iter().map(|(k, v)| (k, v.clone())))
    }
}
