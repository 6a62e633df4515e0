pub mod request;
pub mod sisu;

pub use request::{
    ActionForm, ActionRequest, ActionResponse, Attachment, DimensionDescriptor, FormField,
    FormSelectOption, MeasureDescriptor, QueryFields, QueryPayload, ReportQuery, ScheduledPlan,
    SortState,
};
pub use sisu::{
    AnalysisCreated, CustomQuery, DefaultDimensionIds, DesiredDirection, KdaChain, MetricCreated,
    NewAnalysis, NewCustomQuery, NewMetric, QueryDimension, SisuConnection, TableInfo, TableList,
};
