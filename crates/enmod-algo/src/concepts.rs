//! Concept and type names of the built-in catalogue.

pub const TIME_VECTOR: &str = "TimeVector";
pub const HORIZON: &str = "Horizon";
pub const PARAM: &str = "Param";
pub const COMMODITY: &str = "Commodity";
pub const CONVERSION: &str = "Conversion";
pub const LOSS: &str = "Loss";
pub const PRICE: &str = "Price";
pub const BALANCE: &str = "Balance";
pub const FLOW: &str = "Flow";
pub const STORAGE: &str = "Storage";
pub const ARROW: &str = "Arrow";
pub const CAPACITY: &str = "Capacity";
pub const COST: &str = "Cost";
pub const RHS_TERM: &str = "RHSTerm";
pub const BOUNDARY_CONDITION: &str = "BoundaryCondition";

/// Commodity whose balances get a slack flow.
pub const POWER: &str = "Power";

/// Concept of the start-state variable block of a storage.
pub const STORAGE_START: &str = "StorageStart";
/// Concept of the cyclic boundary constraint of a storage.
pub const START_EQUAL_STOP: &str = "StartEqualStop";
/// Prefix of the instance name of a balance's slack flow.
pub const SLACK_PREFIX: &str = "SlackFlow";

pub mod types {
    pub const CONSTANT_TIME_VECTOR: &str = "ConstantTimeVector";
    pub const INFINITE_TIME_VECTOR: &str = "InfiniteTimeVector";
    pub const ROTATING_TIME_VECTOR: &str = "RotatingTimeVector";
    pub const SEQUENTIAL_HORIZON: &str = "SequentialHorizon";
    pub const CONSTANT_PARAM: &str = "ConstantParam";
    pub const MEAN_SERIES_PARAM: &str = "MeanSeriesParam";
    pub const MW_TO_GWH_SERIES_PARAM: &str = "MWToGWhSeriesParam";
    pub const BASE_COMMODITY: &str = "BaseCommodity";
    pub const BASE_CONVERSION: &str = "BaseConversion";
    pub const SIMPLE_LOSS: &str = "SimpleLoss";
    pub const BASE_PRICE: &str = "BasePrice";
    pub const BASE_BALANCE: &str = "BaseBalance";
    pub const EXOGEN_BALANCE: &str = "ExogenBalance";
    pub const BASE_FLOW: &str = "BaseFlow";
    pub const BASE_STORAGE: &str = "BaseStorage";
    pub const BASE_ARROW: &str = "BaseArrow";
    pub const POSITIVE_CAPACITY: &str = "PositiveCapacity";
    pub const COST_TERM: &str = "CostTerm";
    pub const BASE_RHS_TERM: &str = "BaseRHSTerm";
    pub const START_EQUAL_STOP: &str = "StartEqualStop";
}
