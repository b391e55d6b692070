use slotmap::new_key_type;

new_key_type! {
    /// Handle of an atom or lone pair inside a [`Molecule`](super::molecule::Molecule).
    pub struct PairGroupId;
}
