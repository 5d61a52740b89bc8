mod test_device_recovery;
mod test_screen_share;
