//! Prompt text for Manim code generation.

/// System instruction shared by every code provider.
///
/// Steers models away from LaTeX-backed mobjects since the render host is
/// not assumed to have a TeX installation.
pub const SYSTEM_PROMPT: &str = "\
You are an expert in Manim Community Edition animations. \
Generate complete, runnable Python code for the animation the user describes.

Requirements:
1. Start with `from manim import *`.
2. Define exactly one class that subclasses `Scene` (or another Manim scene type).
3. Put the animation in that class's `construct(self)` method.
4. Use only the Manim Community API.
5. Return only Python code in a single ```python fenced block, with no explanation.

Avoid anything that requires LaTeX:
- do not use Tex() or MathTex();
- do not call get_axis_labels(), get_x_axis_label() or get_y_axis_label();
- use Text() for all labels and formulas;
- build Axes() without labels.

Example:

```python
from manim import *

class MyScene(Scene):
    def construct(self):
        title = Text(\"Title\", font_size=36)
        axes = Axes(x_range=[-3, 3, 1], y_range=[-3, 3, 1], axis_config={\"color\": BLUE})
        self.play(Write(title))
        self.play(Create(axes))
```";

/// Builds the `(system, user)` message pair for a generation request.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build_chat(&self, description: &str) -> (String, String) {
        let user = format!(
            "Generate Manim animation code for the following description:\n\n{}",
            description.trim()
        );
        (SYSTEM_PROMPT.to_string(), user)
    }
}
