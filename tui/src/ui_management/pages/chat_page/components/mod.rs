pub mod message_input_box;
pub mod name_input_box;
pub mod room_list;
