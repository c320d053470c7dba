//! Orders and the records checkout writes alongside them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use grocer_core::{
    Money, OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId, ShippingDetailsId,
    ShippingStatus, UserId,
};

/// Payment method recorded when the request names none.
pub const DEFAULT_PAYMENT_METHOD: &str = "mock";

/// A placed order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_id: Option<PaymentId>,
    pub created_at: DateTime<Utc>,
}

/// An order item with its product name, for receipts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    /// Price snapshot taken at checkout.
    pub unit_price: Decimal,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        Money::line_total(self.unit_price, self.quantity)
    }
}

/// Mock payment record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub method: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Shipping record for an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShippingDetails {
    pub id: ShippingDetailsId,
    pub order_id: OrderId,
    pub recipient_name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub status: ShippingStatus,
    pub created_at: DateTime<Utc>,
}

/// Everything shown on an order receipt.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub payment: Option<Payment>,
    pub shipping: Option<ShippingDetails>,
}

/// Shipping address captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient_name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

/// Validated checkout input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub method: String,
    pub shipping: Option<ShippingAddress>,
}

impl CheckoutRequest {
    /// A request with the default payment method and no shipping.
    #[must_use]
    pub fn mock() -> Self {
        Self {
            method: DEFAULT_PAYMENT_METHOD.to_owned(),
            shipping: None,
        }
    }

    #[must_use]
    pub fn with_shipping(mut self, shipping: ShippingAddress) -> Self {
        self.shipping = Some(shipping);
        self
    }
}

/// A checkout form field longer than its column allows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} must be at most {max} characters")]
pub struct FieldTooLong {
    pub field: &'static str,
    pub max: usize,
}

/// Raw `POST /checkout` form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    pub method: Option<String>,
    pub recipient_name: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

impl CheckoutForm {
    /// Normalize the form. Shipping is recorded only when both the
    /// recipient and the first address line are present.
    ///
    /// # Errors
    ///
    /// Returns [`FieldTooLong`] for the first field that exceeds its
    /// column length.
    pub fn into_request(self) -> Result<CheckoutRequest, FieldTooLong> {
        let method = checked("method", 50, self.method)?
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_owned());

        let recipient_name = checked("recipient_name", 100, self.recipient_name)?;
        let address_line1 = checked("address_line1", 200, self.address_line1)?;
        let address_line2 = checked("address_line2", 200, self.address_line2)?;
        let city = checked("city", 100, self.city)?;
        let region = checked("region", 100, self.region)?;
        let postal_code = checked("postal_code", 20, self.postal_code)?;
        let country = checked("country", 100, self.country)?;
        let phone = checked("phone", 50, self.phone)?;

        let shipping = match (recipient_name, address_line1) {
            (Some(recipient_name), Some(address_line1)) => Some(ShippingAddress {
                recipient_name,
                address_line1,
                address_line2,
                city,
                region,
                postal_code,
                country,
                phone,
            }),
            _ => None,
        };

        Ok(CheckoutRequest { method, shipping })
    }
}

/// Trimmed non-blank value, at most `max` characters.
fn checked(
    field: &'static str,
    max: usize,
    value: Option<String>,
) -> Result<Option<String>, FieldTooLong> {
    match non_blank(value) {
        Some(v) if v.chars().count() > max => Err(FieldTooLong { field, max }),
        other => Ok(other),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_form_defaults_to_mock_without_shipping() {
        let request = CheckoutForm::default().into_request().unwrap();
        assert_eq!(request, CheckoutRequest::mock());
    }

    #[test]
    fn test_form_requires_recipient_and_first_line() {
        let form = CheckoutForm {
            recipient_name: Some("Ana Lim".to_string()),
            city: Some("Singapore".to_string()),
            ..CheckoutForm::default()
        };
        assert!(form.into_request().unwrap().shipping.is_none());
    }

    #[test]
    fn test_form_with_shipping() {
        let form = CheckoutForm {
            method: Some(" card ".to_string()),
            recipient_name: Some("Ana Lim".to_string()),
            address_line1: Some("1 Orchard Rd".to_string()),
            address_line2: Some("   ".to_string()),
            postal_code: Some("238801".to_string()),
            ..CheckoutForm::default()
        };
        let request = form.into_request().unwrap();
        assert_eq!(request.method, "card");
        let shipping = request.shipping.unwrap();
        assert_eq!(shipping.address_line1, "1 Orchard Rd");
        assert_eq!(shipping.address_line2, None);
        assert_eq!(shipping.postal_code.as_deref(), Some("238801"));
    }

    #[test]
    fn test_form_rejects_oversized_fields() {
        let form = CheckoutForm {
            method: Some("m".repeat(51)),
            ..CheckoutForm::default()
        };
        assert_eq!(
            form.into_request().unwrap_err(),
            FieldTooLong {
                field: "method",
                max: 50
            }
        );

        let form = CheckoutForm {
            recipient_name: Some("x".repeat(150)),
            address_line1: Some("1 Orchard Rd".to_string()),
            ..CheckoutForm::default()
        };
        let err = form.into_request().unwrap_err();
        assert_eq!(err.field, "recipient_name");
        assert_eq!(err.to_string(), "recipient_name must be at most 100 characters");
    }

    #[test]
    fn test_form_length_counts_characters() {
        let form = CheckoutForm {
            recipient_name: Some("é".repeat(100)),
            address_line1: Some("1 Orchard Rd".to_string()),
            ..CheckoutForm::default()
        };
        assert!(form.into_request().is_ok());
    }

    #[test]
    fn test_order_line_total() {
        let line = OrderLine {
            product_id: ProductId::new(1),
            product_name: "Bananas".to_string(),
            quantity: 4,
            unit_price: Decimal::new(55, 2),
        };
        assert_eq!(line.line_total(), Decimal::new(220, 2));
    }
}
