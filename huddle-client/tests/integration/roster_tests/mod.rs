mod test_reactions;
mod test_remote_state;
