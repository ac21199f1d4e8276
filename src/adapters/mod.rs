pub mod mercado_pago;
pub mod payload;
pub mod registry;
pub mod stripe;
