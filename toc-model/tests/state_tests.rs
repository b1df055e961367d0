use toc_model::DocumentState;

#[test]
fn states_advance_in_pipeline_order_and_stop_at_done() {
    let mut state = DocumentState::Pending;
    let mut seen = vec![state];
    while !state.is_terminal() {
        state = state.advance();
        seen.push(state);
    }
    assert_eq!(
        seen,
        vec![
            DocumentState::Pending,
            DocumentState::Extracting,
            DocumentState::Segmenting,
            DocumentState::Chunking,
            DocumentState::Summarizing,
            DocumentState::Done,
        ]
    );
    assert_eq!(DocumentState::Done.advance(), DocumentState::Done);
    assert!(DocumentState::Failed.is_terminal());
    assert_eq!(DocumentState::Failed.advance(), DocumentState::Failed);
}
