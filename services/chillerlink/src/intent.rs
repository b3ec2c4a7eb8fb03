//! Typed operator intents and named presets
//!
//! Every verb of the controller's command grammar has an [`Intent`] variant.
//! Rendering applies the console's number formatting: percentages are clamped
//! to 0..100 with one decimal, set-points use two decimals and calibration
//! offsets three.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::LinkError;

/// Controller operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    Auto,
    Service,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Service => "SERVICE",
        }
    }
}

/// Water pumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pump {
    Evap,
    Cond,
    /// Cooling tower
    Tower,
}

impl Pump {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evap => "EVAP",
            Self::Cond => "COND",
            Self::Tower => "CT",
        }
    }
}

/// Electronic expansion valves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Valve {
    Evap,
    /// Economizer
    Econ,
}

impl Valve {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evap => "EVAP",
            Self::Econ => "ECON",
        }
    }
}

/// Water loops with a flow meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowLoop {
    Evap,
    Cond,
}

impl FlowLoop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evap => "EVAP",
            Self::Cond => "COND",
        }
    }
}

/// Simulated faults for training; `None` leaves simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimFault {
    None,
    EvapFlowFail,
    EvapFlowLost,
    CondFlowFail,
    CondFlowLost,
    HiDischP,
    LoSuctionP,
    SensorStuckLwt,
}

impl SimFault {
    pub const ALL: [SimFault; 8] = [
        SimFault::None,
        SimFault::EvapFlowFail,
        SimFault::EvapFlowLost,
        SimFault::CondFlowFail,
        SimFault::CondFlowLost,
        SimFault::HiDischP,
        SimFault::LoSuctionP,
        SimFault::SensorStuckLwt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::EvapFlowFail => "EVAP_FLOW_FAIL",
            Self::EvapFlowLost => "EVAP_FLOW_LOST",
            Self::CondFlowFail => "COND_FLOW_FAIL",
            Self::CondFlowLost => "COND_FLOW_LOST",
            Self::HiDischP => "HI_DISCH_P",
            Self::LoSuctionP => "LO_SUCTION_P",
            Self::SensorStuckLwt => "SENSOR_STUCK_LWT",
        }
    }
}

impl FromStr for SimFault {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| LinkError::config(format!("unknown fault: {}", s)))
    }
}

/// One operator action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Intent {
    SetMode(Mode),
    /// Clear latched alarms
    Reset,
    Pump { pump: Pump, on: bool },
    Eev { valve: Valve, percent: f64 },
    TowerFan(f64),
    VfdRun(bool),
    VfdSpeed(f64),
    SetpointLwt(f64),
    SetpointLwtDeadband(f64),
    Simulation(bool),
    SimFault(SimFault),
    CalTemp { point: String, offset: f64 },
    CalFlow { flow: FlowLoop, offset: f64 },
    CalPress { point: String, offset: f64 },
}

impl Intent {
    /// Command line for this intent, without terminator
    pub fn to_command(&self) -> String {
        match self {
            Self::SetMode(mode) => format!("MODE {}", mode.as_str()),
            Self::Reset => "RESET".to_string(),
            Self::Pump { pump, on } => format!("PUMP {} {}", pump.as_str(), on_off(*on)),
            Self::Eev { valve, percent } => {
                format!("EEV {} {:.1}", valve.as_str(), clamp_percent(*percent))
            },
            Self::TowerFan(percent) => format!("TOWER FAN {:.1}", clamp_percent(*percent)),
            Self::VfdRun(on) => format!("VFD RUN {}", on_off(*on)),
            Self::VfdSpeed(percent) => format!("VFD SPEED {:.1}", clamp_percent(*percent)),
            Self::SetpointLwt(value) => format!("SP LWT {:.2}", finite_or_zero(*value)),
            Self::SetpointLwtDeadband(value) => {
                format!("SP LWT_DB {:.2}", finite_or_zero(*value))
            },
            Self::Simulation(on) => format!("SIM {}", on_off(*on)),
            Self::SimFault(SimFault::None) => "SIM OFF".to_string(),
            Self::SimFault(fault) => format!("SIM FAULT {}", fault.as_str()),
            Self::CalTemp { point, offset } => {
                format!("CAL TEMP {} {:.3}", point.trim(), finite_or_zero(*offset))
            },
            Self::CalFlow { flow, offset } => {
                format!("CAL FLOW {} {:.3}", flow.as_str(), finite_or_zero(*offset))
            },
            Self::CalPress { point, offset } => {
                format!("CAL PRESS {} {:.3}", point.trim(), finite_or_zero(*offset))
            },
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command())
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn clamp_percent(value: f64) -> f64 {
    finite_or_zero(value).clamp(0.0, 100.0)
}

/// A named, fixed intent exposed to operators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub intent: Intent,
}

/// Stable preset names, mirroring the console's buttons
pub static PRESETS: &[Preset] = &[
    Preset {
        name: "mode-auto",
        description: "Automatic control",
        intent: Intent::SetMode(Mode::Auto),
    },
    Preset {
        name: "mode-service",
        description: "Service mode (enables manual outputs)",
        intent: Intent::SetMode(Mode::Service),
    },
    Preset {
        name: "reset",
        description: "Clear latched alarms",
        intent: Intent::Reset,
    },
    Preset {
        name: "evap-pump-on",
        description: "Start evaporator pump",
        intent: Intent::Pump {
            pump: Pump::Evap,
            on: true,
        },
    },
    Preset {
        name: "evap-pump-off",
        description: "Stop evaporator pump",
        intent: Intent::Pump {
            pump: Pump::Evap,
            on: false,
        },
    },
    Preset {
        name: "cond-pump-on",
        description: "Start condenser pump",
        intent: Intent::Pump {
            pump: Pump::Cond,
            on: true,
        },
    },
    Preset {
        name: "cond-pump-off",
        description: "Stop condenser pump",
        intent: Intent::Pump {
            pump: Pump::Cond,
            on: false,
        },
    },
    Preset {
        name: "ct-pump-on",
        description: "Start cooling tower pump",
        intent: Intent::Pump {
            pump: Pump::Tower,
            on: true,
        },
    },
    Preset {
        name: "ct-pump-off",
        description: "Stop cooling tower pump",
        intent: Intent::Pump {
            pump: Pump::Tower,
            on: false,
        },
    },
    Preset {
        name: "vfd-run-on",
        description: "Run compressor VFD",
        intent: Intent::VfdRun(true),
    },
    Preset {
        name: "vfd-run-off",
        description: "Stop compressor VFD",
        intent: Intent::VfdRun(false),
    },
    Preset {
        name: "sim-on",
        description: "Enter training simulation",
        intent: Intent::Simulation(true),
    },
    Preset {
        name: "sim-off",
        description: "Leave training simulation",
        intent: Intent::Simulation(false),
    },
    Preset {
        name: "fault-none",
        description: "Clear simulated fault",
        intent: Intent::SimFault(SimFault::None),
    },
    Preset {
        name: "fault-evap-flow-fail",
        description: "Simulate evaporator flow failing to prove",
        intent: Intent::SimFault(SimFault::EvapFlowFail),
    },
    Preset {
        name: "fault-evap-flow-lost",
        description: "Simulate loss of evaporator flow",
        intent: Intent::SimFault(SimFault::EvapFlowLost),
    },
    Preset {
        name: "fault-cond-flow-fail",
        description: "Simulate condenser flow failing to prove",
        intent: Intent::SimFault(SimFault::CondFlowFail),
    },
    Preset {
        name: "fault-cond-flow-lost",
        description: "Simulate loss of condenser flow",
        intent: Intent::SimFault(SimFault::CondFlowLost),
    },
    Preset {
        name: "fault-hi-disch-p",
        description: "Simulate high discharge pressure",
        intent: Intent::SimFault(SimFault::HiDischP),
    },
    Preset {
        name: "fault-lo-suction-p",
        description: "Simulate low suction pressure",
        intent: Intent::SimFault(SimFault::LoSuctionP),
    },
    Preset {
        name: "fault-sensor-stuck-lwt",
        description: "Simulate a stuck leaving water sensor",
        intent: Intent::SimFault(SimFault::SensorStuckLwt),
    },
];

/// Look up a preset by name (case-insensitive)
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    let name = name.trim();
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}
