mod test_candidate_queue;
mod test_deferred_renegotiation;
mod test_glare;
mod test_offer_answer;
