pub mod booking;
pub mod payment;
pub mod session;
pub mod user;
pub mod user_state;

pub use booking::{Booking, NewBooking};
pub use payment::Payment;
pub use session::{BookingSession, BookingStep, StepOutcome};
pub use user::{NewUser, User};
pub use user_state::UserIntent;
