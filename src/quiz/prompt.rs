use super::{roadmap::RoadmapRequest, QuizRequest, OPTIONS_PER_QUESTION};

/// Instruction for generating `request.count` multiple-choice questions.
///
/// The request is expected to have gone through [`QuizRequest::validated`].
pub fn quiz_prompt(request: &QuizRequest) -> String {
    let QuizRequest {
        topic,
        count,
        difficulty,
    } = request;

    format!(
        r#"Generate exactly {count} multiple-choice questions about {topic} at {difficulty} difficulty.
For each question, provide:
- Clear question text
- {OPTIONS_PER_QUESTION} plausible options
- Correct answer, copied word for word from the options
- Brief explanation (1 sentence)
- Difficulty level

Format as a JSON array of exactly {count} objects, exactly like this:
[
  {{
    "question": "What is...?",
    "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
    "correctAnswer": "Option 3",
    "topic": "{topic}",
    "difficulty": "{difficulty}",
    "explanation": "Brief explanation why this is correct"
  }}
]

Return ONLY valid JSON. No additional text or markdown."#
    )
}

/// Instruction for generating a study roadmap graph.
pub fn roadmap_prompt(request: &RoadmapRequest) -> String {
    let RoadmapRequest { subject, level } = request;

    format!(
        r##"Create a detailed study roadmap for {subject} at {level} level.

Return the data ONLY as a valid JSON object with two arrays:
1. "nodes" array with objects having: id (string, unique), type (optional string), data (object with label), position (object with numeric x and y coordinates), and style (object with background, color, border, width)
2. "edges" array with objects having: id (string, unique), source (string), target (string), and animated (boolean)

Every edge source and target must be the id of a node in the "nodes" array.

The nodes should include:
- the subdivisions of the subject as nodes
- the connections between them as edges
- try making it as detailed as possible
- use different colours as per the hierarchy

Example format:
{{
  "nodes": [
    {{
      "id": "1",
      "type": "input",
      "data": {{ "label": "Main Topic" }},
      "position": {{ "x": 250, "y": 5 }},
      "style": {{ "background": "#3b82f6", "color": "white", "border": "1px solid #2563eb", "width": 180 }}
    }},
    {{
      "id": "2",
      "data": {{ "label": "Subtopic" }},
      "position": {{ "x": 250, "y": 105 }},
      "style": {{ "background": "#22c55e", "color": "white", "border": "1px solid #16a34a", "width": 160 }}
    }}
  ],
  "edges": [
    {{ "id": "e1-2", "source": "1", "target": "2", "animated": true }}
  ]
}}

Return ONLY valid JSON. No additional text or markdown."##
    )
}
