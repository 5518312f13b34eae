pub mod razorpay;
pub mod shopmozo;
pub mod whatsapp;

pub use razorpay::{CreateOrderRequest, PaymentGateway, RazorpayClient, RazorpayOrder, RazorpayPayment};
pub use shopmozo::{ShipmentOrderPayload, ShipmentProduct, ShippingCarrier, ShopmozoClient};
pub use whatsapp::{MessageGateway, WhatsAppClient};
