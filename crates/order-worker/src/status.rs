//! 履约状态策略
//!
//! 订单写入存储后需要把电商平台上的状态改为"待发货"或"数字订单完成"。
//! 状态码是进程级配置，而非从订单数据推导。

use order_shared::config::FulfillmentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    pub physical_status_id: u32,
    pub digital_status_id: u32,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::from(&FulfillmentConfig::default())
    }
}

impl From<&FulfillmentConfig> for StatusPolicy {
    fn from(config: &FulfillmentConfig) -> Self {
        Self {
            physical_status_id: config.physical_status_id,
            digital_status_id: config.digital_status_id,
        }
    }
}

impl StatusPolicy {
    pub fn status_for(&self, order_is_digital: bool) -> u32 {
        if order_is_digital {
            self.digital_status_id
        } else {
            self.physical_status_id
        }
    }
}
