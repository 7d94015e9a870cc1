use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::format::{compose_address, pad_left, PROPERTY_SEQUENCE_WIDTH, TAXPAYER_CODE_WIDTH};

/// The fiscal record of a taxpayer, as published by the municipal data export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxpayerRecord {
    #[serde(rename = "CODIGO", deserialize_with = "lenient_text")]
    pub code: String,
    #[serde(rename = "RAZON_SOCIAL", default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(
        rename = "DISTRITO_DOMICILIO_FISCAL",
        default,
        deserialize_with = "lenient_text"
    )]
    pub fiscal_district: String,
    #[serde(rename = "DOMICILIO_FISCAL", default, deserialize_with = "lenient_text")]
    pub fiscal_address: String,
    #[serde(rename = "adicional", default)]
    pub supplementary: Supplementary,
    #[serde(rename = "valorafectototal", default, deserialize_with = "lenient_amount")]
    pub total_taxable_value: f64,
    #[serde(rename = "hlp_npre", default)]
    pub property_summary: Option<PropertySummary>,
    /// The properties of the taxpayer keyed by property code, in the order they were stored.
    #[serde(rename = "hr_predios", default)]
    pub properties: IndexMap<String, PropertyRecord>,
}

impl TaxpayerRecord {
    /// The taxpayer code padded to the width printed on every form.
    pub fn padded_code(&self) -> String {
        pad_left(&self.code, TAXPAYER_CODE_WIDTH, '0')
    }

    pub fn property(&self, property_code: &str) -> Option<&PropertyRecord> {
        self.properties.get(property_code)
    }

    /// The number of properties declared by the export, falling back to the ones actually listed.
    pub fn declared_property_count(&self) -> u64 {
        self.property_summary
            .as_ref()
            .map(|summary| summary.property_count)
            .unwrap_or(self.properties.len() as u64)
    }
}

/// The `adicional` block of the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Supplementary {
    #[serde(rename = "documento", default, deserialize_with = "lenient_text")]
    pub document_number: String,
    #[serde(rename = "nautova", default, deserialize_with = "lenient_amount")]
    pub assessed_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    #[serde(rename = "nro_predios", default, deserialize_with = "lenient_count")]
    pub property_count: u64,
}

/// One real-estate unit of a taxpayer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(rename = "pred", default, deserialize_with = "lenient_text")]
    pub sequence: String,
    #[serde(rename = "codpredio", default, deserialize_with = "lenient_text")]
    pub code: String,
    #[serde(rename = "sectorpredio", default, deserialize_with = "lenient_text")]
    pub sector: String,
    #[serde(rename = "tipogrupohab", default, deserialize_with = "lenient_text")]
    pub housing_group_type: String,
    #[serde(rename = "grupourbano", default, deserialize_with = "lenient_text")]
    pub urban_group: String,
    #[serde(rename = "tipovia", default, deserialize_with = "lenient_text")]
    pub road_type: String,
    #[serde(rename = "nombrevia", default, deserialize_with = "lenient_text")]
    pub road_name: String,
    #[serde(rename = "direccion", default, deserialize_with = "lenient_text")]
    pub address: String,
    #[serde(rename = "nvalpre", default, deserialize_with = "lenient_amount")]
    pub assessed_value: f64,
    /// Printed verbatim, the export already formats it.
    #[serde(rename = "nporcen", default, deserialize_with = "lenient_text")]
    pub percentage: String,
    #[serde(rename = "afecto", default, deserialize_with = "lenient_amount")]
    pub taxable_value: f64,
    #[serde(rename = "pu_predio", default)]
    pub classification: Option<Classification>,
    #[serde(rename = "pu_predio2", default)]
    pub valuation: Option<Valuation>,
    #[serde(rename = "hla_tasas", default)]
    pub rates: Option<ArbitrationRates>,
    #[serde(rename = "hla_cuotas", default)]
    pub fees: Option<ArbitrationFees>,
}

impl PropertyRecord {
    /// The full address of the property.
    pub fn full_address(&self) -> String {
        compose_address([
            self.sector.as_str(),
            self.housing_group_type.as_str(),
            self.urban_group.as_str(),
            self.road_type.as_str(),
            self.road_name.as_str(),
            self.address.as_str(),
        ])
    }

    pub fn padded_sequence(&self) -> String {
        pad_left(&self.sequence, PROPERTY_SEQUENCE_WIDTH, '0')
    }
}

/// The `pu_predio` block: use and state of the property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "tipopredio", default, deserialize_with = "lenient_text")]
    pub property_type: String,
    #[serde(rename = "usogen", default, deserialize_with = "lenient_text")]
    pub general_use: String,
    #[serde(rename = "estadocons", default, deserialize_with = "lenient_text")]
    pub construction_state: String,
    #[serde(rename = "condicion", default, deserialize_with = "lenient_text")]
    pub condition: String,
}

/// The `pu_predio2` block: components of the assessed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    #[serde(rename = "nterren", default, deserialize_with = "lenient_amount")]
    pub land_value: f64,
    #[serde(rename = "narecom", default, deserialize_with = "lenient_amount")]
    pub built_area_value: f64,
    #[serde(rename = "narance", default, deserialize_with = "lenient_amount")]
    pub tariff_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationRates {
    #[serde(rename = "nfrente", default, deserialize_with = "lenient_amount")]
    pub frontage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationFees {
    #[serde(rename = "bc", default, deserialize_with = "lenient_amount")]
    pub base_fee: f64,
}

/// The export is not consistent in its scalar types, so the same field can be a string,
/// a number or `null` depending on the taxpayer.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientScalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match LenientScalar::deserialize(deserializer)? {
        LenientScalar::Text(text) => text,
        LenientScalar::Integer(integer) => integer.to_string(),
        LenientScalar::Float(float) => float.to_string(),
        LenientScalar::Boolean(boolean) => boolean.to_string(),
        LenientScalar::Null => String::new(),
    })
}

fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match LenientScalar::deserialize(deserializer)? {
        LenientScalar::Integer(integer) => Ok(integer as f64),
        LenientScalar::Float(float) => Ok(float),
        LenientScalar::Null => Ok(0.0),
        LenientScalar::Text(text) if text.trim().is_empty() => Ok(0.0),
        LenientScalar::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid amount {:?}", text))
        }),
        LenientScalar::Boolean(boolean) => Err(serde::de::Error::custom(format!(
            "invalid amount {:?}",
            boolean
        ))),
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let amount = lenient_amount(deserializer)?;
    if amount < 0.0 || amount.fract() != 0.0 {
        return Err(serde::de::Error::custom(format!(
            "invalid property count {}",
            amount
        )));
    }
    Ok(amount as u64)
}
