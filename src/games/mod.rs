pub mod hive_mind;
