mod common;
mod rankings;
