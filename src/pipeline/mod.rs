// Listing processing: text extraction, normalization and feasibility

pub mod processing;
