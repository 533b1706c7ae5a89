pub mod energy_accountant;
