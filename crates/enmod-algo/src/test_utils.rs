//! Dataset builders for tests, demos and benchmarks.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use enmod_core::{AttrValue, Attributes, DataElement};

use crate::concepts::*;

pub fn sequential_horizon(name: &str, periods: usize, hours: f64) -> DataElement {
    DataElement::new(
        HORIZON,
        types::SEQUENTIAL_HORIZON,
        name,
        Attributes::new()
            .with("NumPeriods", periods as f64)
            .with("PeriodHours", hours),
    )
}

pub fn commodity(name: &str, horizon: &str) -> DataElement {
    DataElement::new(
        COMMODITY,
        types::BASE_COMMODITY,
        name,
        Attributes::new().with("Horizon", horizon),
    )
}

pub fn constant_param(name: &str, value: f64) -> DataElement {
    DataElement::new(
        PARAM,
        types::CONSTANT_PARAM,
        name,
        Attributes::new().with("Value", value),
    )
}

pub fn balance(name: &str, commodity: &str) -> DataElement {
    DataElement::new(
        BALANCE,
        types::BASE_BALANCE,
        name,
        Attributes::new().with("Commodity", commodity),
    )
}

pub fn exogen_balance(name: &str, commodity: &str, price: impl Into<AttrValue>) -> DataElement {
    DataElement::new(
        BALANCE,
        types::EXOGEN_BALANCE,
        name,
        Attributes::new()
            .with("Commodity", commodity)
            .with("Price", price),
    )
}

pub fn flow(name: &str) -> DataElement {
    DataElement::new(FLOW, types::BASE_FLOW, name, Attributes::new())
}

pub fn arrow(
    name: &str,
    flow: &str,
    balance: &str,
    conversion: impl Into<AttrValue>,
    direction: &str,
) -> DataElement {
    DataElement::new(
        ARROW,
        types::BASE_ARROW,
        name,
        Attributes::new()
            .with("Flow", flow)
            .with("Balance", balance)
            .with("Conversion", conversion)
            .with("Direction", direction),
    )
}

pub fn capacity(
    name: &str,
    concept: &str,
    instance: &str,
    param: impl Into<AttrValue>,
    bound: &str,
) -> DataElement {
    DataElement::new(
        CAPACITY,
        types::POSITIVE_CAPACITY,
        name,
        Attributes::new()
            .with("Param", param)
            .with("WhichConcept", concept)
            .with("WhichInstance", instance)
            .with("Bound", bound),
    )
}

pub fn cost(
    name: &str,
    concept: &str,
    instance: &str,
    param: impl Into<AttrValue>,
    direction: &str,
) -> DataElement {
    DataElement::new(
        COST,
        types::COST_TERM,
        name,
        Attributes::new()
            .with("Param", param)
            .with("WhichConcept", concept)
            .with("WhichInstance", instance)
            .with("Direction", direction),
    )
}

pub fn rhs_term(
    name: &str,
    balance: &str,
    param: impl Into<AttrValue>,
    direction: &str,
) -> DataElement {
    DataElement::new(
        RHS_TERM,
        types::BASE_RHS_TERM,
        name,
        Attributes::new()
            .with("Balance", balance)
            .with("Param", param)
            .with("Direction", direction),
    )
}

pub fn storage(name: &str, balance: &str, initial_level: f64) -> DataElement {
    DataElement::new(
        STORAGE,
        types::BASE_STORAGE,
        name,
        Attributes::new()
            .with("Balance", balance)
            .with("InitialLevel", initial_level),
    )
}

pub fn start_equal_stop(name: &str, storage: &str) -> DataElement {
    DataElement::new(
        BOUNDARY_CONDITION,
        types::START_EQUAL_STOP,
        name,
        Attributes::new()
            .with("WhichConcept", STORAGE)
            .with("WhichInstance", storage),
    )
}

/// One power balance fed by one flow capped at 100, three hourly periods.
pub fn single_flow_dataset() -> Vec<DataElement> {
    vec![
        sequential_horizon("h", 3, 1.0),
        commodity(POWER, "h"),
        balance("B", POWER),
        flow("F"),
        arrow("A", "F", "B", 1.0, "Out"),
        capacity("Cap", FLOW, "F", 100.0, "Upper"),
    ]
}

/// Like [`single_flow_dataset`] but the arrow names a flow that does not
/// exist.
pub fn dangling_arrow_dataset() -> Vec<DataElement> {
    vec![
        sequential_horizon("h", 3, 1.0),
        commodity(POWER, "h"),
        balance("B", POWER),
        flow("F"),
        arrow("A", "F2", "B", 1.0, "Out"),
    ]
}

/// A power balance with nothing but its slack.
pub fn slack_only_dataset() -> Vec<DataElement> {
    vec![
        sequential_horizon("h", 2, 1.0),
        commodity(POWER, "h"),
        balance("B", POWER),
    ]
}

/// A one-day power system in four 6-hour periods: daily load shape, a
/// thermal unit, imports from a spot market over a lossy line, and a
/// battery.
pub fn dispatch_dataset() -> Vec<DataElement> {
    vec![
        sequential_horizon("day", 4, 6.0),
        commodity(POWER, "day"),
        balance("Grid", POWER),
        DataElement::new(
            PRICE,
            types::BASE_PRICE,
            "spot",
            Attributes::new().with("Param", "spot_level"),
        ),
        constant_param("spot_level", 60.0),
        exogen_balance("Spot", POWER, "spot"),
        DataElement::new(
            TIME_VECTOR,
            types::ROTATING_TIME_VECTOR,
            "load_shape",
            Attributes::new()
                .with(
                    "Index",
                    vec![
                        "2025-01-01T00:00:00",
                        "2025-01-01T06:00:00",
                        "2025-01-01T12:00:00",
                        "2025-01-01T18:00:00",
                    ],
                )
                .with("Values", vec![0.8, 1.0, 1.2, 1.0])
                .with("Stop", "2025-01-02T00:00:00"),
        ),
        DataElement::new(
            PARAM,
            types::MEAN_SERIES_PARAM,
            "load",
            Attributes::new().with("Level", 100.0).with("Profile", "load_shape"),
        ),
        rhs_term("Demand", "Grid", "load", "Out"),
        flow("Thermal"),
        arrow("ThermalGrid", "Thermal", "Grid", 1.0, "In"),
        capacity("ThermalMax", FLOW, "Thermal", 80.0, "Upper"),
        cost("ThermalFuel", FLOW, "Thermal", 40.0, "In"),
        flow("Import"),
        DataElement::new(
            LOSS,
            types::SIMPLE_LOSS,
            "line",
            Attributes::new().with("LossFactor", 0.02).with("Utilisation", 1.0),
        ),
        DataElement::new(
            ARROW,
            types::BASE_ARROW,
            "ImportGrid",
            Attributes::new()
                .with("Flow", "Import")
                .with("Balance", "Grid")
                .with("Conversion", 1.0)
                .with("Direction", "In")
                .with("Loss", "line"),
        ),
        arrow("ImportSpot", "Import", "Spot", 1.0, "Out"),
        capacity("ImportMax", FLOW, "Import", 50.0, "Upper"),
        storage("Battery", "Grid", 10.0),
        capacity("BatteryMax", STORAGE, "Battery", 30.0, "Upper"),
    ]
}

/// Write `elements` as a JSON array, the format the command line reads.
pub fn write_dataset(elements: &[DataElement], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(elements).context("serializing dataset")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
