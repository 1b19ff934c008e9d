pub mod delinquency;
