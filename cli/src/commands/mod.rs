pub mod balance;
pub mod configure;
pub mod deposit;
pub mod donate;
pub mod faucet;
pub mod forget;
pub mod history;
pub mod info;
pub mod keygen;
pub mod register;
pub mod withdraw;
