pub mod repo;

pub use repo::{
    HttpDeliveryRepository, HttpRequest, HttpResponse, ReqwestHttpDeliveryRepository,
};
