mod helper;
mod root;
