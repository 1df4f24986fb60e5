pub mod agenda;
pub mod booking;
pub mod conflict;
pub mod waitlist;

pub use agenda::AgendaService;
pub use booking::BookingService;
