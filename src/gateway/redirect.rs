use serde::Serialize;

use crate::{
    db::{Address, Order},
    settings::Settings,
};

/// Field set for the browser form POST that hands the customer off to the
/// hosted payment page. Declaration order is the order the fields are sent
/// in. No request is made here, the storefront renders these into an
/// auto-submitting form.
#[derive(Debug, Serialize)]
pub struct RedirectFields {
    pub ps_store_id: String,
    pub hpp_key: String,
    pub charge_total: String,
    pub cust_id: String,
    /// Sent only against the production store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Echoed back by the gateway on the success return and used there to
    /// find the order.
    pub rvar_order_id: String,
    #[serde(flatten)]
    pub shipping: Option<ShippingFields>,
    #[serde(flatten)]
    pub billing: Option<BillingFields>,
}

#[derive(Debug, Serialize)]
pub struct ShippingFields {
    pub ship_first_name: String,
    pub ship_last_name: String,
    pub ship_company_name: String,
    pub ship_city: String,
    pub ship_phone: String,
    pub ship_fax: String,
    pub ship_postal_code: String,
    pub ship_address_one: String,
    pub ship_state_or_province: String,
    pub ship_country: String,
}

#[derive(Debug, Serialize)]
pub struct BillingFields {
    pub bill_first_name: String,
    pub bill_last_name: String,
    pub bill_company_name: String,
    pub bill_phone: String,
    pub bill_fax: String,
    pub bill_postal_code: String,
    pub bill_city: String,
    pub bill_address_one: String,
    pub bill_state_or_province: String,
    pub bill_country: String,
}

impl RedirectFields {
    pub fn assemble(
        settings: &Settings,
        order: &Order,
        billing: Option<&Address>,
        shipping: Option<&Address>,
    ) -> Self {
        let charge_total = order.total + settings.additional_fee_minor(order.total);
        Self {
            ps_store_id: settings.ps_store_id.clone(),
            hpp_key: settings.hpp_key.clone(),
            charge_total: format_amount(charge_total),
            cust_id: order.customer_id.to_string(),
            order_id: (!settings.use_sandbox).then(|| order.id.to_string()),
            email: billing.map(|billing| billing.email.clone()),
            rvar_order_id: order.id.to_string(),
            shipping: shipping.map(ShippingFields::from),
            billing: billing.map(BillingFields::from),
        }
    }
}

impl From<&Address> for ShippingFields {
    fn from(address: &Address) -> Self {
        Self {
            ship_first_name: address.first_name.clone(),
            ship_last_name: address.last_name.clone(),
            ship_company_name: address.company.clone(),
            ship_city: address.city.clone(),
            ship_phone: address.phone.clone(),
            ship_fax: address.fax.clone(),
            ship_postal_code: address.postal_code.clone(),
            ship_address_one: address_line(address),
            ship_state_or_province: address.state_or_province.clone().unwrap_or_default(),
            ship_country: address.country.clone().unwrap_or_default(),
        }
    }
}

impl From<&Address> for BillingFields {
    fn from(address: &Address) -> Self {
        Self {
            bill_first_name: address.first_name.clone(),
            bill_last_name: address.last_name.clone(),
            bill_company_name: address.company.clone(),
            bill_phone: address.phone.clone(),
            bill_fax: address.fax.clone(),
            bill_postal_code: address.postal_code.clone(),
            bill_city: address.city.clone(),
            bill_address_one: address_line(address),
            bill_state_or_province: address.state_or_province.clone().unwrap_or_default(),
            bill_country: address.country.clone().unwrap_or_default(),
        }
    }
}

// The HPP takes both address lines in a single field
fn address_line(address: &Address) -> String {
    format!("1: {} 2: {}", address.address1, address.address2)
}

/// Locale independent rendering of an amount in minor units, `4999` turns
/// into `"49.99"`.
fn format_amount(minor: i64) -> String {
    format!("{:.2}", minor as f64 / 100.)
}
