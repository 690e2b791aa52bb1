//! 新订单通知内容渲染
//!
//! 订单与子资源以原始 JSON 保存，这里按文本展示读取字段：
//! 缺失或为 null 的字段显示为空，数字和布尔值按 JSON 文本显示。

use serde_json::Value;

use crate::models::EnrichedOrder;

const RULE: &str = "====================";

/// 发布到通知主题的主题与正文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderNotification {
    pub subject: String,
    pub message: String,
}

impl OrderNotification {
    pub fn render(order: &EnrichedOrder) -> Self {
        let id = order.id;
        let ship_to = order.primary_shipping_address();
        let address = |name: &str| text(ship_to.and_then(|a| a.get(name)));

        let products = order
            .products
            .iter()
            .map(|p| {
                format!(
                    "Sku: {} Quantity: {} Name: {}",
                    text(p.get("sku")),
                    text(p.get("quantity")),
                    text(p.get("name"))
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let message = format!(
            "{RULE}\n\
             NEW ORDER {id} has been placed.\n\
             Status: {status}\n\
             Payment Method: {payment_method}\n\
             Payment Total: {total}\n\
             {customer_message}\n\
             {RULE}\n\
             {shipping_method}\n\
             SHIP TO\n\
             {first_name} {last_name}\n\
             {company}\n\
             {street_1}\n\
             {street_2}\n\
             {city}, {state} {zip}\n\
             {country}\n\
             {RULE}\n\
             {products}\n\
             {RULE}\n",
            status = text(order.field("status")),
            payment_method = text(order.field("payment_method")),
            total = text(order.field("total_inc_tax")),
            customer_message = text(order.field("customer_message")),
            shipping_method = address("shipping_method"),
            first_name = address("first_name"),
            last_name = address("last_name"),
            company = address("company"),
            street_1 = address("street_1"),
            street_2 = address("street_2"),
            city = address("city"),
            state = address("state"),
            zip = address("zip"),
            country = address("country"),
        );

        Self {
            subject: format!("New Order {id}"),
            message,
        }
    }
}

/// 字段的展示文本
fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Order;
    use order_shared::test_utils::TestDataGenerator;
    use serde_json::json;

    fn collection(value: Value) -> Vec<Value> {
        serde_json::from_value(value).unwrap()
    }

    fn enriched(id: u64) -> EnrichedOrder {
        let order = Order::parse(&TestDataGenerator::order(id, false).to_string()).unwrap();
        order.enrich(
            collection(TestDataGenerator::products(id)),
            collection(TestDataGenerator::shipping_addresses(id)),
            vec![],
        )
    }

    #[test]
    fn test_render_full_notification() {
        let notification = OrderNotification::render(&enriched(42));

        assert_eq!(notification.subject, "New Order 42");
        let expected = "\
====================
NEW ORDER 42 has been placed.
Status: Awaiting Fulfillment
Payment Method: Credit Card
Payment Total: 109.9900
Please gift wrap
====================
Royal Mail 1st Class
SHIP TO
Ada Lovelace
Analytical Engines Ltd
12 Marylebone Rd
Flat 3
London, Greater London NW1 5LR
United Kingdom
====================
Sku: TSHIRT-BLK-M Quantity: 2 Name: Black T-Shirt
Sku: MUG-01 Quantity: 1 Name: Coffee Mug
====================
";
        assert_eq!(notification.message, expected);
    }

    #[test]
    fn test_render_without_shipping_address_or_products() {
        let order = Order::parse(&TestDataGenerator::order(5, true).to_string()).unwrap();
        let notification = OrderNotification::render(&order.enrich(vec![], vec![], vec![]));

        assert!(notification.message.contains("SHIP TO\n \n\n\n\n,  \n\n"));
        // 无商品时两条分隔线之间保留一个空行
        assert!(
            notification
                .message
                .ends_with("====================\n\n====================\n")
        );
    }

    #[test]
    fn test_render_loose_field_types() {
        let body = json!({
            "id": 9,
            "status": null,
            "total_inc_tax": 12.5,
            "products": {"resource": "/orders/9/products"},
            "shipping_addresses": {"resource": "/orders/9/shipping_addresses"},
            "coupons": {"resource": "/orders/9/coupons"},
        })
        .to_string();
        let order = Order::parse(&body).unwrap().enrich(
            vec![json!({"sku": null, "quantity": "3", "name": "Gift card"})],
            vec![json!({"city": "Beverly Hills", "state": "CA", "zip": 90210})],
            vec![],
        );

        let message = OrderNotification::render(&order).message;

        assert!(message.contains("Status: \n"));
        assert!(message.contains("Payment Total: 12.5\n"));
        assert!(message.contains("Beverly Hills, CA 90210\n"));
        assert!(message.contains("Sku:  Quantity: 3 Name: Gift card\n"));
    }
}
