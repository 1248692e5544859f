pub mod interface;

pub use interface::{
    IntentStatus, NewPaymentIntent, PaymentError, PaymentGateway, PaymentIntentHandle,
};
