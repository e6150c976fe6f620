pub mod surf_logging;
