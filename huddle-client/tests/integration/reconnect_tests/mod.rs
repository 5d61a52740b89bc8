mod test_reconnect_exhausted;
mod test_reconnect_restores_local_state;
