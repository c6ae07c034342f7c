//! PayFast hosted payment form and ITN verification
//!
//! Outgoing forms are signed over PayFast's documented field order; incoming
//! ITNs are verified over the fields in the order they were received.

use md5::{Digest, Md5};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::Order;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use super::{PaymentOutcome, Settlement};

pub const SANDBOX_URL: &str = "https://sandbox.payfast.co.za/eng/process";
pub const LIVE_URL: &str = "https://www.payfast.co.za/eng/process";

/// Field order PayFast uses when computing the form signature
const FIELD_ORDER: [&str; 26] = [
    "merchant_id",
    "merchant_key",
    "return_url",
    "cancel_url",
    "notify_url",
    "name_first",
    "name_last",
    "email_address",
    "cell_number",
    "m_payment_id",
    "amount",
    "item_name",
    "item_description",
    "email_confirmation",
    "confirmation_address",
    "payment_method",
    "custom_int1",
    "custom_int2",
    "custom_int3",
    "custom_int4",
    "custom_int5",
    "custom_str1",
    "custom_str2",
    "custom_str3",
    "custom_str4",
    "custom_str5",
];

/// Published ITN source ranges (network, prefix length)
const ITN_SOURCE_RANGES: [(Ipv4Addr, u32); 5] = [
    (Ipv4Addr::new(197, 97, 145, 144), 28),
    (Ipv4Addr::new(41, 74, 179, 192), 27),
    (Ipv4Addr::new(102, 216, 36, 0), 28),
    (Ipv4Addr::new(102, 216, 36, 128), 28),
    (Ipv4Addr::new(144, 126, 193, 139), 32),
];

/// Merchant configuration
#[derive(Debug, Clone)]
pub struct PayFastSettings {
    pub merchant_id: String,
    pub merchant_key: String,
    pub passphrase: Option<String>,
    pub sandbox: bool,
}

/// Signed form the browser posts to PayFast
#[derive(Debug, Clone, Serialize)]
pub struct PaymentForm {
    pub payment_url: String,
    pub payment_data: BTreeMap<String, String>,
}

impl PayFastSettings {
    pub fn payment_url(&self) -> &'static str {
        if self.sandbox { SANDBOX_URL } else { LIVE_URL }
    }

    fn passphrase(&self) -> Option<&str> {
        self.passphrase
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Build and sign the payment form for an unpaid order
    pub fn build_payment_form(
        &self,
        order: &Order,
        site_url: &str,
        now_millis: i64,
    ) -> Result<PaymentForm, AppError> {
        let amount = format_amount(order.total_amount)?;
        let id = order.id;

        let mut data = BTreeMap::new();
        let mut put = |key: &str, value: String| {
            let value = value.trim().to_string();
            if !value.is_empty() {
                data.insert(key.to_string(), value);
            }
        };

        put("merchant_id", self.merchant_id.clone());
        put("merchant_key", self.merchant_key.clone());
        put(
            "return_url",
            format!("{site_url}/account?payment=success&orderId={id}"),
        );
        put(
            "cancel_url",
            format!("{site_url}/cart/payment/cancelled?orderId={id}"),
        );
        put("notify_url", format!("{site_url}/api/payfast/notify"));

        if let Some(name) = order.customer_name.as_deref() {
            let (first, last) = split_name(name);
            put("name_first", first.to_string());
            put("name_last", last.to_string());
        }
        if let Some(email) = order.customer_email.as_deref().filter(|e| e.contains('@')) {
            put("email_address", email.to_string());
        }
        if let Some(cell) = order.customer_phone.as_deref().and_then(sanitize_cell_number) {
            put("cell_number", cell);
        }

        put(
            "m_payment_id",
            merchant_payment_id(&order.order_number, now_millis),
        );
        put("amount", amount);
        put(
            "item_name",
            format!("Little Latte Lane Order {}", order.order_number),
        );
        put("item_description", format!("Order {} ({})", order.order_number, order.order_type));
        put("custom_str1", id.to_string());
        if let Some(user_id) = order.user_id {
            put("custom_str2", user_id.to_string());
        }

        let signature = self.sign_form(&data);
        data.insert("signature".to_string(), signature);

        Ok(PaymentForm {
            payment_url: self.payment_url().to_string(),
            payment_data: data,
        })
    }

    /// Signature over the form fields in PayFast's documented order
    pub fn sign_form(&self, data: &BTreeMap<String, String>) -> String {
        let pairs: Vec<(&str, &str)> = FIELD_ORDER
            .iter()
            .filter_map(|field| {
                data.get(*field)
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(|v| (*field, v))
            })
            .collect();
        md5_hex(&param_string(&pairs, self.passphrase()))
    }

    /// Verify an ITN: fields other than `signature`, in received order,
    /// signed with or without the passphrase.
    pub fn verify_itn(&self, fields: &[(String, String)]) -> bool {
        let Some(received) = fields
            .iter()
            .find(|(k, _)| k == "signature")
            .map(|(_, v)| v.trim().to_ascii_lowercase())
        else {
            return false;
        };

        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .filter(|(k, _)| k != "signature")
            .map(|(k, v)| (k.as_str(), v.trim()))
            .collect();

        if md5_hex(&param_string(&pairs, None)) == received {
            return true;
        }
        self.passphrase()
            .is_some_and(|p| md5_hex(&param_string(&pairs, Some(p))) == received)
    }
}

fn param_string(pairs: &[(&str, &str)], passphrase: Option<&str>) -> String {
    let mut out = pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", php_urlencode(v)))
        .collect::<Vec<_>>()
        .join("&");
    if let Some(p) = passphrase {
        out.push_str("&passphrase=");
        out.push_str(&php_urlencode(p));
    }
    out
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// PHP `urlencode`: alphanumerics and `-_.` kept, space as `+`,
/// everything else `%XX` upper-case
pub fn php_urlencode(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%20", "+")
        .replace('~', "%7E")
}

/// Strip spaces, dashes and brackets; keep only if at least 10 characters remain
pub fn sanitize_cell_number(phone: &str) -> Option<String> {
    let cleaned: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();
    (cleaned.len() >= 10).then_some(cleaned)
}

pub fn merchant_payment_id(order_number: &str, now_millis: i64) -> String {
    format!("LLL-{order_number}-{now_millis}")
}

/// Two-decimal amount within PayFast's accepted range
pub fn format_amount(total: Decimal) -> Result<String, AppError> {
    let amount = shared::util::round_money(total);
    let min = Decimal::new(1, 2);
    let max = Decimal::new(99_999_999, 2);
    if amount < min || amount > max {
        return Err(AppError::with_message(
            ErrorCode::PaymentAmountOutOfRange,
            format!("Amount {amount} must be between 0.01 and 999999.99"),
        )
        .with_detail("amount", amount.to_string()));
    }
    Ok(format!("{amount:.2}"))
}

/// Parse `amount_gross` and compare to the order total (±0.01)
pub fn amount_matches(amount_gross: &str, total: Decimal) -> bool {
    amount_gross
        .trim()
        .parse::<Decimal>()
        .ok()
        .and_then(|paid| paid.checked_sub(total))
        .is_some_and(|diff| diff.abs() <= Decimal::new(1, 2))
}

/// Settlement for an ITN's `payment_status` and `amount_gross`
pub fn settlement(payment_status: &str, amount_gross: Option<&str>, total: Decimal) -> Settlement {
    if payment_status != "COMPLETE" {
        return Settlement::Unsuccessful(PaymentOutcome::Failed);
    }
    if amount_gross.is_some_and(|gross| amount_matches(gross, total)) {
        Settlement::Confirm
    } else {
        Settlement::AmountMismatch
    }
}

/// Whether an ITN came from a published PayFast address
pub fn is_payfast_ip(ip: IpAddr) -> bool {
    let IpAddr::V4(v4) = ip else {
        return false;
    };
    let addr = u32::from(v4);
    ITN_SOURCE_RANGES.iter().any(|(net, prefix)| {
        let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
        addr & mask == u32::from(*net) & mask
    })
}

fn split_name(full: &str) -> (&str, &str) {
    let full = full.trim();
    match full.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (full, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderStatus, OrderType, PaymentStatus};
    use uuid::Uuid;

    fn settings(passphrase: Option<&str>) -> PayFastSettings {
        PayFastSettings {
            merchant_id: "10000100".into(),
            merchant_key: "46f0cd694581a".into(),
            passphrase: passphrase.map(String::from),
            sandbox: true,
        }
    }

    fn order(total: Decimal) -> Order {
        Order {
            id: Uuid::from_u128(1),
            user_id: Some(Uuid::from_u128(2)),
            order_number: "LL000007".into(),
            customer_name: Some("Thandi van der Merwe".into()),
            customer_email: Some("thandi@example.com".into()),
            customer_phone: Some("(082) 123-4567".into()),
            subtotal: total,
            delivery_fee: Decimal::ZERO,
            total_amount: total,
            status: OrderStatus::Draft,
            payment_status: PaymentStatus::Pending,
            payment_provider: None,
            payment_reference: None,
            order_type: OrderType::Pickup,
            delivery_address: None,
            delivery_zone: None,
            special_instructions: None,
            estimated_ready_time: None,
            paid_at: None,
            completed_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn itn(passphrase: Option<&str>) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = [
            ("m_payment_id", "LLL-LL000007-1700000000000"),
            ("pf_payment_id", "1089250"),
            ("payment_status", "COMPLETE"),
            ("item_name", "Little Latte Lane Order LL000007"),
            ("amount_gross", "85.50"),
            ("custom_str1", "00000000-0000-0000-0000-000000000001"),
            ("name_first", "Thandi"),
            ("merchant_id", "10000100"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let sig = md5_hex(&param_string(&pairs, passphrase));
        fields.push(("signature".into(), sig));
        fields
    }

    #[test]
    fn test_php_urlencode() {
        assert_eq!(php_urlencode("Little Latte Lane"), "Little+Latte+Lane");
        assert_eq!(
            php_urlencode("https://x.co/a?b=c"),
            "https%3A%2F%2Fx.co%2Fa%3Fb%3Dc"
        );
        assert_eq!(php_urlencode("a-b_c.d~e(f)"), "a-b_c.d%7Ee%28f%29");
    }

    #[test]
    fn test_param_string_order_and_passphrase() {
        let s = param_string(&[("merchant_id", "1"), ("item_name", "Flat White")], Some("salt pass"));
        assert_eq!(s, "merchant_id=1&item_name=Flat+White&passphrase=salt+pass");
    }

    #[test]
    fn test_payment_form_fields() {
        let form = settings(None)
            .build_payment_form(&order(Decimal::new(8550, 2)), "https://latte.example", 1_700_000_000_000)
            .unwrap();
        let data = &form.payment_data;

        assert_eq!(form.payment_url, SANDBOX_URL);
        assert_eq!(data["amount"], "85.50");
        assert_eq!(data["m_payment_id"], "LLL-LL000007-1700000000000");
        assert_eq!(data["cell_number"], "0821234567");
        assert_eq!(data["name_first"], "Thandi");
        assert_eq!(data["name_last"], "van der Merwe");
        assert_eq!(data["custom_str1"], Uuid::from_u128(1).to_string());
        assert_eq!(data["custom_str2"], Uuid::from_u128(2).to_string());
        assert_eq!(data["notify_url"], "https://latte.example/api/payfast/notify");

        let mut unsigned = data.clone();
        let signature = unsigned.remove("signature").unwrap();
        assert_eq!(signature.len(), 32);
        assert_eq!(settings(None).sign_form(&unsigned), signature);
        assert_ne!(settings(Some("secret")).sign_form(&unsigned), signature);
    }

    #[test]
    fn test_live_url_when_not_sandbox() {
        let live = PayFastSettings {
            sandbox: false,
            ..settings(None)
        };
        assert_eq!(live.payment_url(), LIVE_URL);
    }

    #[test]
    fn test_amount_range() {
        assert_eq!(format_amount(Decimal::new(1, 2)).unwrap(), "0.01");
        assert_eq!(format_amount(Decimal::new(100, 0)).unwrap(), "100.00");
        assert!(format_amount(Decimal::ZERO).is_err());
        let err = format_amount(Decimal::new(100_000_000, 2)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentAmountOutOfRange);
    }

    #[test]
    fn test_cell_number_sanitising() {
        assert_eq!(sanitize_cell_number("082 123 4567").as_deref(), Some("0821234567"));
        assert_eq!(sanitize_cell_number("+27 (82) 123-4567").as_deref(), Some("+27821234567"));
        assert_eq!(sanitize_cell_number("123-45"), None);
    }

    #[test]
    fn test_itn_verification() {
        assert!(settings(None).verify_itn(&itn(None)));
        // signed with passphrase, verified by a merchant that has it configured
        assert!(settings(Some("jt7NOE43FZPn")).verify_itn(&itn(Some("jt7NOE43FZPn"))));
        // passphrase-less signature is still accepted when a passphrase is configured
        assert!(settings(Some("jt7NOE43FZPn")).verify_itn(&itn(None)));
        assert!(!settings(None).verify_itn(&itn(Some("jt7NOE43FZPn"))));
    }

    #[test]
    fn test_tampered_itn_rejected() {
        let mut fields = itn(None);
        fields[4].1 = "1.00".into();
        assert!(!settings(None).verify_itn(&fields));

        let unsigned: Vec<_> = itn(None).into_iter().filter(|(k, _)| k != "signature").collect();
        assert!(!settings(None).verify_itn(&unsigned));
    }

    #[test]
    fn test_amount_matching() {
        let total = Decimal::new(8550, 2);
        assert!(amount_matches("85.50", total));
        assert!(amount_matches("85.51", total));
        assert!(!amount_matches("85.52", total));
        assert!(!amount_matches("abc", total));
        assert!(!amount_matches("-79228162514264337593543950335", total));
    }

    #[test]
    fn test_itn_settlement() {
        let total = Decimal::new(8550, 2);
        assert_eq!(settlement("COMPLETE", Some("85.50"), total), Settlement::Confirm);
        assert_eq!(settlement("COMPLETE", Some("85.49"), total), Settlement::Confirm);
        assert_eq!(
            settlement("COMPLETE", Some("85.48"), total),
            Settlement::AmountMismatch
        );
        assert_eq!(settlement("COMPLETE", None, total), Settlement::AmountMismatch);
        assert_eq!(
            settlement("CANCELLED", Some("85.50"), total),
            Settlement::Unsuccessful(PaymentOutcome::Failed)
        );
    }

    #[test]
    fn test_payfast_ip_ranges() {
        assert!(is_payfast_ip("197.97.145.150".parse().unwrap()));
        assert!(is_payfast_ip("41.74.179.223".parse().unwrap()));
        assert!(is_payfast_ip("144.126.193.139".parse().unwrap()));
        assert!(!is_payfast_ip("197.97.145.160".parse().unwrap()));
        assert!(!is_payfast_ip("102.216.36.20".parse().unwrap()));
        assert!(!is_payfast_ip("::1".parse().unwrap()));
    }
}
