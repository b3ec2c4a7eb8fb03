//! Known telemetry fields
//!
//! Labels, units and display precision for the keys the controller publishes,
//! grouped the way the operator panels show them. The store keeps every key it
//! receives; this table only drives presentation.

use serde::Serialize;

use crate::telemetry::TelemetryRecord;

/// Display metadata for one telemetry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Field {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub decimals: usize,
}

const fn field(key: &'static str, label: &'static str, unit: &'static str, decimals: usize) -> Field {
    Field {
        key,
        label,
        unit,
        decimals,
    }
}

/// Operator panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Panel {
    Overview,
    Evaporator,
    Condenser,
    Refrigerant,
    CoolingTower,
    Compressor,
    Alarms,
    Status,
}

impl Panel {
    pub const ALL: [Panel; 8] = [
        Panel::Overview,
        Panel::Evaporator,
        Panel::Condenser,
        Panel::Refrigerant,
        Panel::CoolingTower,
        Panel::Compressor,
        Panel::Alarms,
        Panel::Status,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Evaporator => "Evaporator",
            Self::Condenser => "Condenser",
            Self::Refrigerant => "Refrigerant",
            Self::CoolingTower => "Cooling Tower",
            Self::Compressor => "Compressor / VFD",
            Self::Alarms => "Alarms",
            Self::Status => "Status",
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        match self {
            Self::Overview => OVERVIEW,
            Self::Evaporator => EVAPORATOR,
            Self::Condenser => CONDENSER,
            Self::Refrigerant => REFRIGERANT,
            Self::CoolingTower => COOLING_TOWER,
            Self::Compressor => COMPRESSOR,
            Self::Alarms => ALARMS,
            Self::Status => STATUS,
        }
    }
}

const OVERVIEW: &[Field] = &[
    field("EVAP_LWT_F", "Evap LWT", "°F", 1),
    field("F_EVAP_GPM", "Evap Flow", "GPM", 2),
    field("P_SUCTION", "Suction P", "psig", 1),
    field("P_COMP_DISCH", "Disch P", "psig", 1),
];

const EVAPORATOR: &[Field] = &[
    field("EVAP_LWT_F", "Evap LWT", "°F", 1),
    field("EVAP_EWT_F", "Evap EWT", "°F", 1),
    field("F_EVAP_GPM", "Evap Flow", "GPM", 2),
];

const CONDENSER: &[Field] = &[
    field("COND_LWT_F", "Cond LWT", "°F", 1),
    field("COND_EWT_F", "Cond EWT", "°F", 1),
    field("F_COND_GPM", "Cond Flow", "GPM", 2),
];

const REFRIGERANT: &[Field] = &[
    field("P_SUCTION", "Suction P", "psig", 1),
    field("P_COMP_DISCH", "Disch P", "psig", 1),
    field("P_LIQUID_LINE", "Liquid Line P", "psig", 1),
    field("SUCTION_F", "Suction Temp", "°F", 1),
    field("DISCHARGE_F", "Discharge Temp", "°F", 1),
    field("LIQ_LINE_F", "Liquid Temp", "°F", 1),
];

const COOLING_TOWER: &[Field] = &[
    field("F_COND_GPM", "Cond Flow", "GPM", 2),
    field("COND_EWT_F", "Cond EWT", "°F", 1),
    field("F_AHU_GPM", "AHU Flow", "GPM", 2),
];

const COMPRESSOR: &[Field] = &[
    field("AO_CompSpeedCmd_pct", "Speed Cmd", "%", 1),
    field("MAN_VFDRun", "Manual Run", "", 0),
    field("MAN_VFDSpeedPct", "Manual Speed", "%", 1),
];

const ALARMS: &[Field] = &[
    field("ALM_EvapFlowFailToProve", "Evap Flow Fail to Prove", "", 0),
    field("ALM_EvapFlowLost", "Evap Flow Lost", "", 0),
    field("ALM_CondFlowFailToProve", "Cond Flow Fail to Prove", "", 0),
    field("ALM_CondFlowLost", "Cond Flow Lost", "", 0),
    field("ALM_HiDischP", "High Discharge P", "", 0),
    field("ALM_LoSuctionP", "Low Suction P", "", 0),
    field("ALM_VFDFault", "VFD Fault", "", 0),
    field("ALM_SensorFault", "Sensor Fault", "", 0),
    field("ALM_TrainingMode", "Training Mode", "", 0),
];

const STATUS: &[Field] = &[
    field("STAT_Mode", "Mode", "", 0),
    field("STAT_ModeTimer_s", "Mode Timer", "s", 1),
    field("STAT_ServiceMode", "Service Mode", "", 0),
    field("SP_LWT", "SP LWT", "°F", 1),
    field("SP_LWT_DB", "SP Deadband", "°F", 1),
    field("EVT_Last", "Last Event", "", 0),
];

/// Metadata for `key`, if it is a known field
pub fn lookup(key: &str) -> Option<&'static Field> {
    Panel::ALL
        .iter()
        .flat_map(|panel| panel.fields().iter())
        .find(|f| f.key == key)
}

/// Display text for one field of `record`; `--` when unavailable
pub fn format_field(record: &TelemetryRecord, field: &Field) -> String {
    match record.get(field.key) {
        Some(value) => value.display(field.decimals),
        None => "--".to_string(),
    }
}

/// Keys of alarm fields that are currently active
pub fn active_alarms(record: &TelemetryRecord) -> Vec<&'static Field> {
    ALARMS
        .iter()
        .filter(|f| record.get(f.key).is_some_and(|v| v.is_truthy()))
        .collect()
}
