//! Connected components by minimum-label propagation.
//!
//! Every node starts labelled with its own id; each round a node adopts the
//! smallest label among itself and its neighbours. At the fixpoint each node
//! carries the smallest id in its component.

use tracing::{debug, trace};

use crate::arithmetic::{GraphMatrices, Semiring, SparseMatrix};
use crate::procedure::{
    ArgSpec, Invocation, OutputSpec, Procedure, ProcedureError, ProcedureSignature, Row, ValueType,
};
use crate::query::Value;

/// Registered name.
pub const PROCEDURE_NAME: &str = "algo.CC";

const NODE_COLUMN: &str = "Nodeidx";
const LABEL_COLUMN: &str = "value";

/// `algo.CC(relationshipType)`.
///
/// A `null` argument considers every relationship. Edge direction is
/// ignored. Yields one row holding two parallel arrays: node ids and their
/// component labels.
pub struct ConnectedComponents<'g> {
    graph: &'g dyn GraphMatrices,
    signature: ProcedureSignature,
    matrix: Option<SparseMatrix>,
}

impl<'g> ConnectedComponents<'g> {
    /// Creates an uninvoked instance over `graph`.
    pub fn new(graph: &'g dyn GraphMatrices) -> Self {
        Self {
            graph,
            signature: ProcedureSignature {
                name: PROCEDURE_NAME,
                args: vec![ArgSpec {
                    name: "relationshipType",
                    ty: ValueType::String,
                    nullable: true,
                }],
                outputs: vec![
                    OutputSpec {
                        name: NODE_COLUMN,
                        ty: ValueType::Array,
                    },
                    OutputSpec {
                        name: LABEL_COLUMN,
                        ty: ValueType::Array,
                    },
                ],
                read_only: true,
            },
            matrix: None,
        }
    }
}

/// Registry constructor.
pub fn create<'g>(graph: &'g dyn GraphMatrices) -> Box<dyn Procedure + 'g> {
    Box::new(ConnectedComponents::new(graph))
}

/// `A + Aᵀ` with boolean entries.
fn symmetrize(source: &SparseMatrix) -> Result<SparseMatrix, ProcedureError> {
    let mut out = SparseMatrix::new(source.nrows(), source.ncols());
    let (rows, cols, _) = source.extract_tuples();
    for (row, col) in rows.into_iter().zip(cols) {
        out.set_element(1, row, col)?;
        out.set_element(1, col, row)?;
    }
    Ok(out)
}

/// Component label per node, indexed by node id.
pub fn component_labels(matrix: &SparseMatrix) -> Result<Vec<u64>, ProcedureError> {
    let n = matrix.nrows();
    let mut labels = SparseMatrix::new(n, 1);
    for node in 0..n {
        labels.set_element(node, node, 0)?;
    }
    let mut rounds = 0usize;
    loop {
        let pulled = matrix.multiply(&labels, Semiring::MinSecond)?;
        let next = pulled.ewise_min(&labels)?;
        rounds += 1;
        if next == labels {
            break;
        }
        labels = next;
    }
    trace!(rounds, nodes = n, "label propagation converged");
    let (_, _, values) = labels.extract_tuples();
    Ok(values)
}

impl Procedure for ConnectedComponents<'_> {
    fn signature(&self) -> &ProcedureSignature {
        &self.signature
    }

    fn invoke(&mut self, args: &[Value]) -> Result<Invocation, ProcedureError> {
        let source = match args.first().and_then(Value::as_str) {
            None => Some(self.graph.adjacency_matrix()),
            Some(relation) => self.graph.relation_matrix(relation),
        };
        let Some(source) = source else {
            debug!(procedure = PROCEDURE_NAME, "relationship type not found");
            return Ok(Invocation::ResourceNotFound);
        };
        self.matrix = Some(symmetrize(source)?);
        Ok(Invocation::Ready)
    }

    fn step(&mut self) -> Result<Option<Row>, ProcedureError> {
        let Some(matrix) = self.matrix.take() else {
            return Ok(None);
        };
        let labels = component_labels(&matrix)?;
        let nodes = (0..labels.len()).map(|id| Value::Int(id as i64)).collect();
        let values = labels.into_iter().map(|label| Value::Int(label as i64)).collect();
        Ok(Some(Row::new([
            (NODE_COLUMN, Value::Array(nodes)),
            (LABEL_COLUMN, Value::Array(values)),
        ])))
    }

    fn free(&mut self) {
        self.matrix = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::InMemoryGraph;

    #[test]
    fn labels_are_component_minimums() {
        let mut m = SparseMatrix::new(5, 5);
        m.set_element(1, 1, 0).unwrap();
        m.set_element(1, 3, 4).unwrap();
        let sym = symmetrize(&m).unwrap();
        assert_eq!(sym.get(0, 1), Some(1));
        assert_eq!(component_labels(&sym).unwrap(), vec![0, 0, 2, 3, 3]);
    }

    #[test]
    fn long_path_converges() {
        let mut m = SparseMatrix::new(6, 6);
        for i in (1..6).rev() {
            m.set_element(1, i, i - 1).unwrap();
        }
        let labels = component_labels(&symmetrize(&m).unwrap()).unwrap();
        assert_eq!(labels, vec![0; 6]);
    }

    #[test]
    fn step_yields_once() {
        let mut graph = InMemoryGraph::new(3);
        graph.add_edge("R", 2, 1).unwrap();
        let mut cc = ConnectedComponents::new(&graph);
        assert_eq!(
            cc.invoke(&[Value::from("R")]).unwrap(),
            Invocation::Ready
        );
        let row = cc.step().unwrap().expect("one row");
        assert_eq!(
            row.get("value"),
            Some(&Value::Array(vec![Value::Int(0), Value::Int(1), Value::Int(1)]))
        );
        assert!(cc.step().unwrap().is_none());
    }
}
