//! Fallback dropdown reference data.
//!
//! The authoritative lists live in reference tables maintained outside this
//! subsystem; these constants are the seed/fallback values the UI shows
//! when those tables are empty.

pub const SHIP_METHODS: &[&str] = &[
    "UPS Ground",
    "UPS 2nd Day Air",
    "UPS Next Day Air",
    "FedEx Ground",
    "FedEx Express",
    "FedEx 2 Day",
    "USPS Priority Mail",
    "USPS Express Mail",
    "LTL Freight",
    "Truck Freight",
    "Customer Pickup",
    "Will Call",
    "Local Delivery",
];

pub const PAYMENT_TERMS: &[&str] = &[
    "Net 10 Days",
    "Net 30 Days",
    "Net 60 Days",
    "Net 90 Days",
    "Cash On Delivery",
    "Prepaid",
    "Cash In Advance",
    "2% 10 Net 30",
    "Credit Card",
    "ACH/Wire Transfer",
];
