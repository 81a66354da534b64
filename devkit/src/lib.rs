/*!
# DSS DevKit - Stubs et Utilitaires pour les tests du kernel

Bibliothèque facilitant les tests du kernel DSS avec:
- Source externe simulée (sonde /health, routes JSON, requêtes enregistrées)
- Harness HTTP pour tester un router de bout en bout
- Assertions sur les champs JSON des réponses
*/

pub mod mock_source;
pub mod test_utils;

pub use mock_source::{MockSource, RecordedRequest};
pub use test_utils::{get_nested_field, TestHarness, TestResponse};
