pub mod ad_ops;
