use crate::validator::AddressValidator;

pub struct AppState {
    pub validator: AddressValidator,
}
