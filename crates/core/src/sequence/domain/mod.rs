pub mod sequence_plan;
