mod gate;
pub use gate::Gate;

mod home;
pub use home::Home;
