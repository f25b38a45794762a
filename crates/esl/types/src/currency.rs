//! ISO 4217 currency identifiers
//!
//! A [`CurrencyCode`] is a denomination tag, never an amount. It can only be
//! constructed from a code that appears in the recognized ISO 4217 table, so
//! holding one is proof the code is valid.

use crate::error::{EslError, EslResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One row of the ISO 4217 table
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Iso4217Entry {
    /// Alphabetic code, e.g. "USD"
    pub code: &'static str,
    /// Numeric code, e.g. 840
    pub numeric: u16,
    /// Decimal exponent of the minor unit; `None` where not applicable (metals, XDR, ...)
    pub minor_units: Option<u8>,
}

const fn entry(code: &'static str, numeric: u16, minor_units: Option<u8>) -> Iso4217Entry {
    Iso4217Entry {
        code,
        numeric,
        minor_units,
    }
}

/// Active ISO 4217 codes, sorted by alphabetic code.
static ISO_4217: &[Iso4217Entry] = &[
    entry("AED", 784, Some(2)),
    entry("AFN", 971, Some(2)),
    entry("ALL", 8, Some(2)),
    entry("AMD", 51, Some(2)),
    entry("ANG", 532, Some(2)),
    entry("AOA", 973, Some(2)),
    entry("ARS", 32, Some(2)),
    entry("AUD", 36, Some(2)),
    entry("AWG", 533, Some(2)),
    entry("AZN", 944, Some(2)),
    entry("BAM", 977, Some(2)),
    entry("BBD", 52, Some(2)),
    entry("BDT", 50, Some(2)),
    entry("BGN", 975, Some(2)),
    entry("BHD", 48, Some(3)),
    entry("BIF", 108, Some(0)),
    entry("BMD", 60, Some(2)),
    entry("BND", 96, Some(2)),
    entry("BOB", 68, Some(2)),
    entry("BOV", 984, Some(2)),
    entry("BRL", 986, Some(2)),
    entry("BSD", 44, Some(2)),
    entry("BTN", 64, Some(2)),
    entry("BWP", 72, Some(2)),
    entry("BYN", 933, Some(2)),
    entry("BZD", 84, Some(2)),
    entry("CAD", 124, Some(2)),
    entry("CDF", 976, Some(2)),
    entry("CHE", 947, Some(2)),
    entry("CHF", 756, Some(2)),
    entry("CHW", 948, Some(2)),
    entry("CLF", 990, Some(4)),
    entry("CLP", 152, Some(0)),
    entry("CNY", 156, Some(2)),
    entry("COP", 170, Some(2)),
    entry("COU", 970, Some(2)),
    entry("CRC", 188, Some(2)),
    entry("CUC", 931, Some(2)),
    entry("CUP", 192, Some(2)),
    entry("CVE", 132, Some(2)),
    entry("CZK", 203, Some(2)),
    entry("DJF", 262, Some(0)),
    entry("DKK", 208, Some(2)),
    entry("DOP", 214, Some(2)),
    entry("DZD", 12, Some(2)),
    entry("EGP", 818, Some(2)),
    entry("ERN", 232, Some(2)),
    entry("ETB", 230, Some(2)),
    entry("EUR", 978, Some(2)),
    entry("FJD", 242, Some(2)),
    entry("FKP", 238, Some(2)),
    entry("GBP", 826, Some(2)),
    entry("GEL", 981, Some(2)),
    entry("GHS", 936, Some(2)),
    entry("GIP", 292, Some(2)),
    entry("GMD", 270, Some(2)),
    entry("GNF", 324, Some(0)),
    entry("GTQ", 320, Some(2)),
    entry("GYD", 328, Some(2)),
    entry("HKD", 344, Some(2)),
    entry("HNL", 340, Some(2)),
    entry("HTG", 332, Some(2)),
    entry("HUF", 348, Some(2)),
    entry("IDR", 360, Some(2)),
    entry("ILS", 376, Some(2)),
    entry("INR", 356, Some(2)),
    entry("IQD", 368, Some(3)),
    entry("IRR", 364, Some(2)),
    entry("ISK", 352, Some(0)),
    entry("JMD", 388, Some(2)),
    entry("JOD", 400, Some(3)),
    entry("JPY", 392, Some(0)),
    entry("KES", 404, Some(2)),
    entry("KGS", 417, Some(2)),
    entry("KHR", 116, Some(2)),
    entry("KMF", 174, Some(0)),
    entry("KPW", 408, Some(2)),
    entry("KRW", 410, Some(0)),
    entry("KWD", 414, Some(3)),
    entry("KYD", 136, Some(2)),
    entry("KZT", 398, Some(2)),
    entry("LAK", 418, Some(2)),
    entry("LBP", 422, Some(2)),
    entry("LKR", 144, Some(2)),
    entry("LRD", 430, Some(2)),
    entry("LSL", 426, Some(2)),
    entry("LYD", 434, Some(3)),
    entry("MAD", 504, Some(2)),
    entry("MDL", 498, Some(2)),
    entry("MGA", 969, Some(2)),
    entry("MKD", 807, Some(2)),
    entry("MMK", 104, Some(2)),
    entry("MNT", 496, Some(2)),
    entry("MOP", 446, Some(2)),
    entry("MRU", 929, Some(2)),
    entry("MUR", 480, Some(2)),
    entry("MVR", 462, Some(2)),
    entry("MWK", 454, Some(2)),
    entry("MXN", 484, Some(2)),
    entry("MXV", 979, Some(2)),
    entry("MYR", 458, Some(2)),
    entry("MZN", 943, Some(2)),
    entry("NAD", 516, Some(2)),
    entry("NGN", 566, Some(2)),
    entry("NIO", 558, Some(2)),
    entry("NOK", 578, Some(2)),
    entry("NPR", 524, Some(2)),
    entry("NZD", 554, Some(2)),
    entry("OMR", 512, Some(3)),
    entry("PAB", 590, Some(2)),
    entry("PEN", 604, Some(2)),
    entry("PGK", 598, Some(2)),
    entry("PHP", 608, Some(2)),
    entry("PKR", 586, Some(2)),
    entry("PLN", 985, Some(2)),
    entry("PYG", 600, Some(0)),
    entry("QAR", 634, Some(2)),
    entry("RON", 946, Some(2)),
    entry("RSD", 941, Some(2)),
    entry("RUB", 643, Some(2)),
    entry("RWF", 646, Some(0)),
    entry("SAR", 682, Some(2)),
    entry("SBD", 90, Some(2)),
    entry("SCR", 690, Some(2)),
    entry("SDG", 938, Some(2)),
    entry("SEK", 752, Some(2)),
    entry("SGD", 702, Some(2)),
    entry("SHP", 654, Some(2)),
    entry("SLE", 925, Some(2)),
    entry("SOS", 706, Some(2)),
    entry("SRD", 968, Some(2)),
    entry("SSP", 728, Some(2)),
    entry("STN", 930, Some(2)),
    entry("SVC", 222, Some(2)),
    entry("SYP", 760, Some(2)),
    entry("SZL", 748, Some(2)),
    entry("THB", 764, Some(2)),
    entry("TJS", 972, Some(2)),
    entry("TMT", 934, Some(2)),
    entry("TND", 788, Some(3)),
    entry("TOP", 776, Some(2)),
    entry("TRY", 949, Some(2)),
    entry("TTD", 780, Some(2)),
    entry("TWD", 901, Some(2)),
    entry("TZS", 834, Some(2)),
    entry("UAH", 980, Some(2)),
    entry("UGX", 800, Some(0)),
    entry("USD", 840, Some(2)),
    entry("USN", 997, Some(2)),
    entry("UYI", 940, Some(0)),
    entry("UYU", 858, Some(2)),
    entry("UYW", 927, Some(4)),
    entry("UZS", 860, Some(2)),
    entry("VED", 926, Some(2)),
    entry("VES", 928, Some(2)),
    entry("VND", 704, Some(0)),
    entry("VUV", 548, Some(0)),
    entry("WST", 882, Some(2)),
    entry("XAF", 950, Some(0)),
    entry("XAG", 961, None),
    entry("XAU", 959, None),
    entry("XBA", 955, None),
    entry("XBB", 956, None),
    entry("XBC", 957, None),
    entry("XBD", 958, None),
    entry("XCD", 951, Some(2)),
    entry("XCG", 532, Some(2)),
    entry("XDR", 960, None),
    entry("XOF", 952, Some(0)),
    entry("XPD", 964, None),
    entry("XPF", 953, Some(0)),
    entry("XPT", 962, None),
    entry("XSU", 994, None),
    entry("XTS", 963, None),
    entry("XUA", 965, None),
    entry("XXX", 999, None),
    entry("YER", 886, Some(2)),
    entry("ZAR", 710, Some(2)),
    entry("ZMW", 967, Some(2)),
    entry("ZWG", 924, Some(2)),
];

/// Canonical, immutable ISO 4217 currency identifier.
///
/// Equality, ordering and hashing follow the alphabetic code, so the type
/// can key ordered and hashed maps. Serializes as the bare code string and
/// re-validates on deserialization.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(&'static Iso4217Entry);

impl CurrencyCode {
    /// Construct from a three-letter uppercase code.
    pub fn new(code: &str) -> EslResult<Self> {
        if code.len() != 3 {
            return Err(invalid(code, "expected exactly 3 characters"));
        }
        if !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(invalid(code, "expected uppercase ASCII letters"));
        }
        ISO_4217
            .binary_search_by(|e| e.code.cmp(code))
            .map(|index| Self(&ISO_4217[index]))
            .map_err(|_| invalid(code, "not an issued ISO 4217 currency"))
    }

    /// Whether `code` would construct successfully.
    pub fn is_recognized(code: &str) -> bool {
        Self::new(code).is_ok()
    }

    /// Every recognized currency, in code order.
    pub fn all() -> impl Iterator<Item = CurrencyCode> {
        ISO_4217.iter().map(CurrencyCode)
    }

    /// Alphabetic code, e.g. "EUR"
    pub fn as_str(&self) -> &'static str {
        self.0.code
    }

    /// ISO 4217 numeric code, e.g. 978 for EUR
    pub fn numeric(&self) -> u16 {
        self.0.numeric
    }

    /// Decimal places of the minor unit; `None` where ISO lists N.A.
    pub fn minor_units(&self) -> Option<u8> {
        self.0.minor_units
    }

    /// Number of minor units per major unit (100 for USD, 1 for JPY and
    /// for codes without a minor unit).
    pub fn denominator(&self) -> u64 {
        10u64.pow(u32::from(self.0.minor_units.unwrap_or(0)))
    }

    /// The table row backing this code
    pub fn entry(&self) -> &'static Iso4217Entry {
        self.0
    }
}

fn invalid(code: &str, reason: &str) -> EslError {
    EslError::InvalidCurrencyCode {
        code: code.to_string(),
        reason: reason.to_string(),
    }
}

impl std::fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CurrencyCode").field(&self.0.code).finish()
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.code)
    }
}

impl FromStr for CurrencyCode {
    type Err = EslError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = EslError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0.code.to_string()
    }
}
