#[derive(Debug, Clone)]
pub enum Action {
    SignUp {
        display_name: String,
        email: String,
        password: String,
    },
    LogIn {
        display_name: String,
        email: String,
        password: String,
    },
    ToggleAuthMode,
    LogOut,
    SendMessage { content: String },
    SelectRoom { room: String },
    UpdateName { name: String },
    Exit,
}
